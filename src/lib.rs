//! Diabetes Risk Service Library
//!
//! Serves a pre-trained diabetes risk classifier over HTTP: raw clinical
//! values are aligned to the training-time feature layout, scaled, and
//! classified.

pub mod config;
pub mod error;
pub mod feature_extractor;
pub mod metrics;
pub mod models;
pub mod predictor;
pub mod schema;
pub mod server;
pub mod types;

pub use config::AppConfig;
pub use error::PredictError;
pub use feature_extractor::FeatureExtractor;
pub use predictor::Predictor;
pub use schema::FeatureSchema;
pub use types::{prediction::PredictionLabel, record::NormalizedRecord};
