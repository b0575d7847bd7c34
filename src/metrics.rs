//! Request metrics and statistics tracking for the prediction service.

use crate::error::PredictError;
use crate::types::prediction::PredictionLabel;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::info;

/// Metrics collector for the prediction endpoint
pub struct ServiceMetrics {
    /// Total prediction requests handled
    pub requests_total: AtomicU64,
    /// Requests answered with "Diabetic"
    pub diabetic: AtomicU64,
    /// Requests answered with "Non-Diabetic"
    pub non_diabetic: AtomicU64,
    /// Failures by error kind
    failures_by_kind: RwLock<HashMap<&'static str, u64>>,
    /// Request latencies (in microseconds)
    latencies: RwLock<Vec<u64>>,
    /// Start time for rate calculation
    start_time: Instant,
}

impl ServiceMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            requests_total: AtomicU64::new(0),
            diabetic: AtomicU64::new(0),
            non_diabetic: AtomicU64::new(0),
            failures_by_kind: RwLock::new(HashMap::new()),
            latencies: RwLock::new(Vec::with_capacity(1000)),
            start_time: Instant::now(),
        }
    }

    /// Record a successful prediction
    pub fn record_prediction(&self, latency: Duration, label: PredictionLabel) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        match label {
            PredictionLabel::Diabetic => self.diabetic.fetch_add(1, Ordering::Relaxed),
            PredictionLabel::NonDiabetic => self.non_diabetic.fetch_add(1, Ordering::Relaxed),
        };
        self.record_latency(latency);
    }

    /// Record a failed request
    pub fn record_failure(&self, latency: Duration, error: &PredictError) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut by_kind) = self.failures_by_kind.write() {
            *by_kind.entry(error.kind()).or_insert(0) += 1;
        }
        self.record_latency(latency);
    }

    fn record_latency(&self, latency: Duration) {
        if let Ok(mut times) = self.latencies.write() {
            times.push(latency.as_micros() as u64);
            // Keep only last 10000 for memory efficiency
            if times.len() > 10000 {
                times.drain(0..5000);
            }
        }
    }

    /// Total failed requests
    pub fn failures_total(&self) -> u64 {
        self.get_failures_by_kind().values().sum()
    }

    /// Get failures by error kind
    pub fn get_failures_by_kind(&self) -> HashMap<&'static str, u64> {
        self.failures_by_kind
            .read()
            .map(|by_kind| by_kind.clone())
            .unwrap_or_default()
    }

    /// Get latency statistics
    pub fn get_latency_stats(&self) -> LatencyStats {
        let mut sorted: Vec<u64> = match self.latencies.read() {
            Ok(times) if !times.is_empty() => times.clone(),
            _ => return LatencyStats::default(),
        };
        sorted.sort_unstable();

        let sum: u64 = sorted.iter().sum();
        let count = sorted.len();
        let percentile = |p: f64| sorted[((count as f64 * p) as usize).min(count - 1)];

        LatencyStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: percentile(0.50),
            p95_us: percentile(0.95),
            p99_us: percentile(0.99),
            max_us: sorted[count - 1],
        }
    }

    /// Get current throughput (requests per second)
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.requests_total.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Print summary statistics
    pub fn print_summary(&self) {
        let total = self.requests_total.load(Ordering::Relaxed);
        let diabetic = self.diabetic.load(Ordering::Relaxed);
        let non_diabetic = self.non_diabetic.load(Ordering::Relaxed);
        let failures = self.get_failures_by_kind();
        let failed: u64 = failures.values().sum();
        let positive_rate = if diabetic + non_diabetic > 0 {
            (diabetic as f64 / (diabetic + non_diabetic) as f64) * 100.0
        } else {
            0.0
        };
        let latency = self.get_latency_stats();

        info!(
            requests = total,
            throughput = format!("{:.2} req/s", self.get_throughput()),
            diabetic = diabetic,
            non_diabetic = non_diabetic,
            positive_rate = format!("{positive_rate:.1}%"),
            failed = failed,
            "Prediction summary"
        );
        info!(
            mean_us = latency.mean_us,
            p50_us = latency.p50_us,
            p95_us = latency.p95_us,
            p99_us = latency.p99_us,
            max_us = latency.max_us,
            "Request latency"
        );
        for (kind, count) in &failures {
            info!(kind = %kind, count = count, "Failures by kind");
        }
    }
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Request latency statistics
#[derive(Debug, Default, PartialEq)]
pub struct LatencyStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

/// Periodic metrics reporter
pub struct MetricsReporter {
    metrics: Arc<ServiceMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<ServiceMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs,
        }
    }

    /// Start the periodic reporting task
    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs.max(1)));
        // The first tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            self.metrics.print_summary();
        }
    }
}
