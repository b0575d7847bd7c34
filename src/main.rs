//! Diabetes Risk Service - Main Entry Point
//!
//! Loads the frozen artifacts once, then serves predictions over HTTP until
//! interrupted.

use anyhow::{Context, Result};
use diabetes_risk_service::{
    config::{AppConfig, LogFormat},
    metrics::{MetricsReporter, ServiceMetrics},
    predictor::Predictor,
    server::{router, AppState},
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = AppConfig::load()?;

    // Initialize logging
    let filter = EnvFilter::from_default_env().add_directive(
        format!("diabetes_risk_service={}", config.logging.level)
            .parse()
            .context("Invalid logging.level")?,
    );
    match config.logging.format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }

    info!("Starting Diabetes Risk Service");
    info!(
        model = %config.artifacts.model_path.display(),
        scaler = %config.artifacts.scaler_path.display(),
        reference = %config.artifacts.reference_dataset_path.display(),
        "Configuration loaded"
    );

    // Missing artifacts abort startup before the port is bound
    let predictor = Arc::new(Predictor::load(&config)?);
    predictor.log_summary();

    let metrics = Arc::new(ServiceMetrics::new());
    if config.metrics.report_interval_secs > 0 {
        let reporter = MetricsReporter::new(metrics.clone(), config.metrics.report_interval_secs);
        tokio::spawn(reporter.start());
    }

    let app = router(AppState::new(predictor, metrics.clone()));

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;
    info!(address = %address, "Listening for prediction requests");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Service shutting down...");
    metrics.print_summary();

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
