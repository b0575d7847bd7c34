//! Per-request error taxonomy for the prediction pipeline.

use thiserror::Error;

/// Errors that can fail a single prediction request.
///
/// None of these are fatal to the process; startup failures go through
/// `anyhow` instead.
#[derive(Debug, Error)]
pub enum PredictError {
    /// Raw input is missing a required field or holds a non-coercible value.
    #[error("{0}")]
    Validation(String),

    /// The numeric columns handed to the scaler do not match what it was fit on.
    #[error("scaler shape mismatch: {0}")]
    ScalerShape(String),

    /// The classifier rejected the encoded vector or failed to run.
    #[error("inference failed: {0}")]
    Inference(String),
}

impl PredictError {
    /// Short label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            PredictError::Validation(_) => "validation",
            PredictError::ScalerShape(_) => "scaler_shape",
            PredictError::Inference(_) => "inference",
        }
    }

    /// Whether the caller is at fault (as opposed to an artifact mismatch).
    pub fn is_client_error(&self) -> bool {
        matches!(self, PredictError::Validation(_))
    }
}

/// Result alias for the prediction pipeline.
pub type PredictResult<T> = std::result::Result<T, PredictError>;
