//! Type definitions for the diabetes risk service

pub mod prediction;
pub mod record;

pub use prediction::{ErrorResponse, PredictionLabel, PredictionResponse};
pub use record::{CanonicalField, NormalizedRecord, RawRecord};
