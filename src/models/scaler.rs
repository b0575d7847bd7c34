//! Fitted standard scaler for the numeric feature columns

use crate::error::{PredictError, PredictResult};
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::info;

/// On-disk scaler export (mirrors the fitted `mean_` / `scale_` attributes)
#[derive(Debug, Deserialize)]
struct ScalerArtifact {
    #[serde(default, alias = "feature_names_in_")]
    feature_names: Option<Vec<String>>,
    #[serde(alias = "mean_")]
    mean: Vec<f64>,
    #[serde(alias = "scale_")]
    scale: Vec<f64>,
}

/// Per-column affine transform `(x - mean) / scale`, frozen at training time.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardScaler {
    feature_names: Option<Vec<String>>,
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl StandardScaler {
    /// Create a scaler from fitted parameters
    pub fn new(mean: Vec<f64>, scale: Vec<f64>, feature_names: Option<Vec<String>>) -> Result<Self> {
        if mean.is_empty() {
            bail!("scaler has no fitted columns");
        }
        if mean.len() != scale.len() {
            bail!(
                "scaler mean has {} entries but scale has {}",
                mean.len(),
                scale.len()
            );
        }
        if let Some(names) = &feature_names {
            if names.len() != mean.len() {
                bail!(
                    "scaler lists {} feature names for {} fitted columns",
                    names.len(),
                    mean.len()
                );
            }
        }
        if let Some(i) = scale.iter().position(|s| *s == 0.0 || !s.is_finite()) {
            bail!("scaler scale for column {} is {}", i, scale[i]);
        }

        Ok(Self {
            feature_names,
            mean,
            scale,
        })
    }

    /// Load a scaler from its JSON export
    pub fn from_json_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scaler from {}", path.display()))?;
        let scaler = Self::from_json_str(&raw)
            .with_context(|| format!("Invalid scaler artifact {}", path.display()))?;

        info!(
            path = %path.display(),
            columns = scaler.n_features(),
            named = scaler.feature_names.is_some(),
            "Scaler loaded"
        );
        Ok(scaler)
    }

    /// Parse a scaler from JSON text
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let artifact: ScalerArtifact =
            serde_json::from_str(raw).context("Failed to parse scaler JSON")?;
        Self::new(artifact.mean, artifact.scale, artifact.feature_names)
    }

    /// Number of columns the scaler was fit on
    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    /// Column names recorded at fit time, if exported
    pub fn feature_names(&self) -> Option<&[String]> {
        self.feature_names.as_deref()
    }

    /// Scale one row of numeric values.
    ///
    /// `columns` names the values in order; it must match the fitted column
    /// names when the artifact recorded them.
    pub fn transform(&self, columns: &[&str], values: &[f64]) -> PredictResult<Vec<f64>> {
        if values.len() != self.n_features() || columns.len() != values.len() {
            return Err(PredictError::ScalerShape(format!(
                "scaler expects {} columns, got {}",
                self.n_features(),
                values.len()
            )));
        }

        if let Some(names) = &self.feature_names {
            if let Some((expected, got)) = names
                .iter()
                .zip(columns)
                .find(|(expected, got)| expected.as_str() != **got)
            {
                return Err(PredictError::ScalerShape(format!(
                    "scaler column order mismatch: expected '{expected}', got '{got}'"
                )));
            }
        }

        Ok(values
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(x, (mean, scale))| (x - mean) / scale)
            .collect())
    }
}
