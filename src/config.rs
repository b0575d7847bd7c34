//! Configuration management for the diabetes risk service

use anyhow::{Context, Result};
use config::{Config, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default location of the configuration file
pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// Environment variable overriding the configuration file path
pub const CONFIG_PATH_ENV: &str = "DIABETES_CONFIG";

/// Environment variable overriding the listening port
pub const PORT_ENV: &str = "PORT";

/// Log output format
#[derive(Debug, Clone, Deserialize, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable, colored output
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub artifacts: ArtifactsConfig,
    pub inference: InferenceConfig,
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind
    pub host: String,
    /// TCP port (the `PORT` environment variable takes precedence)
    pub port: u16,
}

/// Locations of the frozen artifacts loaded at startup
#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactsConfig {
    /// ONNX export of the fitted classifier
    pub model_path: PathBuf,
    /// JSON export of the fitted numeric scaler
    pub scaler_path: PathBuf,
    /// Reference CSV the feature schema is derived from
    pub reference_dataset_path: PathBuf,
    /// Target column dropped from the reference dataset
    pub label_column: String,
}

/// Inference runtime configuration
#[derive(Debug, Clone, Deserialize)]
pub struct InferenceConfig {
    /// Number of intra-op threads for ONNX inference
    pub onnx_threads: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: LogFormat,
}

/// Service metrics configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    /// Seconds between periodic summaries, 0 disables the reporter
    pub report_interval_secs: u64,
}

impl AppConfig {
    /// Load configuration from `DIABETES_CONFIG` or the default path
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let port = match std::env::var(PORT_ENV) {
            Ok(raw) => Some(
                raw.trim()
                    .parse::<u16>()
                    .with_context(|| format!("Invalid {PORT_ENV} value '{raw}'"))?,
            ),
            Err(_) => None,
        };
        Self::load_with_overrides(path, port)
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load_with_overrides(path, None)
    }

    /// Load configuration from a path, applying an optional port override.
    ///
    /// The file is optional; every key falls back to the built-in default.
    pub fn load_with_overrides<P: AsRef<Path>>(path: P, port: Option<u16>) -> Result<Self> {
        let defaults = AppConfig::default();

        let config = Config::builder()
            .set_default("server.host", defaults.server.host)?
            .set_default("server.port", i64::from(defaults.server.port))?
            .set_default("artifacts.model_path", path_default(&defaults.artifacts.model_path))?
            .set_default("artifacts.scaler_path", path_default(&defaults.artifacts.scaler_path))?
            .set_default(
                "artifacts.reference_dataset_path",
                path_default(&defaults.artifacts.reference_dataset_path),
            )?
            .set_default("artifacts.label_column", defaults.artifacts.label_column)?
            .set_default("inference.onnx_threads", defaults.inference.onnx_threads as i64)?
            .set_default("logging.level", defaults.logging.level)?
            .set_default("logging.format", "pretty")?
            .set_default(
                "metrics.report_interval_secs",
                defaults.metrics.report_interval_secs as i64,
            )?
            .add_source(File::from(path.as_ref()).required(false))
            .set_override_option("server.port", port.map(i64::from))?
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Socket address string the server binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn path_default(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 5000, // development port
            },
            artifacts: ArtifactsConfig {
                model_path: PathBuf::from("artifacts/diabetes_model.onnx"),
                scaler_path: PathBuf::from("artifacts/scaler.json"),
                reference_dataset_path: PathBuf::from("artifacts/diabetes_prediction_dataset.csv"),
                label_column: "diabetes".to_string(),
            },
            inference: InferenceConfig { onnx_threads: 1 },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: LogFormat::Pretty,
            },
            metrics: MetricsConfig {
                report_interval_secs: 60,
            },
        }
    }
}
