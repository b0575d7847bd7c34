//! Prediction labels and HTTP response payloads

use serde::{Deserialize, Serialize};
use std::fmt;

/// Diagnosis label derived from the binary classifier output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PredictionLabel {
    #[serde(rename = "Diabetic")]
    Diabetic,
    #[serde(rename = "Non-Diabetic")]
    NonDiabetic,
}

impl PredictionLabel {
    /// Map a model class to a label: `1` is diabetic, anything else is not
    pub fn from_class(class: i64) -> Self {
        if class == 1 {
            PredictionLabel::Diabetic
        } else {
            PredictionLabel::NonDiabetic
        }
    }

    /// Label as returned to callers
    pub fn as_str(&self) -> &'static str {
        match self {
            PredictionLabel::Diabetic => "Diabetic",
            PredictionLabel::NonDiabetic => "Non-Diabetic",
        }
    }
}

impl fmt::Display for PredictionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Successful `/predict` response body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub prediction: PredictionLabel,
}

/// Error response body, carrying the failure message verbatim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
