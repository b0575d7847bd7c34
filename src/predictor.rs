//! Feature aligner + predictor
//!
//! Raw record → normalized record → aligned row → scaled numeric + categorical
//! → classifier → label. Every collaborator is immutable after construction,
//! so one `Predictor` is shared by all request tasks.

use crate::config::{AppConfig, ArtifactsConfig};
use crate::error::PredictResult;
use crate::feature_extractor::{EncodedVector, FeatureExtractor};
use crate::models::inference::{Classifier, OnnxClassifier};
use crate::models::scaler::StandardScaler;
use crate::schema::FeatureSchema;
use crate::types::prediction::PredictionLabel;
use crate::types::record::{NormalizedRecord, RawRecord};
use anyhow::{Context, Result};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct Predictor {
    extractor: FeatureExtractor,
    scaler: StandardScaler,
    classifier: Arc<dyn Classifier>,
}

impl Predictor {
    /// Assemble a predictor from already loaded artifacts.
    ///
    /// Mismatches between schema and scaler are logged here and surface as
    /// per-request errors, since the frozen artifacts cannot be repaired.
    pub fn new(
        schema: Arc<FeatureSchema>,
        scaler: StandardScaler,
        classifier: Arc<dyn Classifier>,
    ) -> Self {
        let extractor = FeatureExtractor::new(schema);

        let missing = extractor.missing_numeric_columns();
        if !missing.is_empty() {
            warn!(missing = ?missing, "Feature schema lacks numeric columns; predictions will fail");
        }
        if scaler.n_features() != extractor.numeric_columns().len() {
            warn!(
                scaler_columns = scaler.n_features(),
                numeric_columns = extractor.numeric_columns().len(),
                "Scaler width does not match numeric columns; predictions will fail"
            );
        }

        Self {
            extractor,
            scaler,
            classifier,
        }
    }

    /// Load every artifact named in the configuration.
    ///
    /// Any missing or unreadable artifact is fatal.
    pub fn load(config: &AppConfig) -> Result<Self> {
        let ArtifactsConfig {
            model_path,
            scaler_path,
            reference_dataset_path,
            label_column,
        } = &config.artifacts;

        let schema = FeatureSchema::from_csv_path(reference_dataset_path, label_column)
            .context("Failed to load feature schema")?;
        let scaler = StandardScaler::from_json_path(scaler_path).context("Failed to load scaler")?;
        let classifier = OnnxClassifier::from_path(model_path, config.inference.onnx_threads)
            .context("Failed to load classifier")?;

        Ok(Self::new(Arc::new(schema), scaler, Arc::new(classifier)))
    }

    /// Number of columns in the model input.
    pub fn feature_count(&self) -> usize {
        self.extractor.feature_count()
    }

    /// Build the model input vector for a record.
    pub fn encode(&self, record: &NormalizedRecord) -> PredictResult<EncodedVector> {
        let row = self.extractor.align(record);
        let split = self.extractor.split(&row)?;
        let scaled = self
            .scaler
            .transform(&self.extractor.numeric_columns(), &split.numeric)?;
        Ok(EncodedVector::assemble(scaled, &split.categorical))
    }

    /// Predict the label for a normalized record.
    pub fn predict(&self, record: &NormalizedRecord) -> PredictResult<PredictionLabel> {
        let vector = self.encode(record)?;
        let class = self.classifier.predict_class(&vector.to_f32())?;
        let label = PredictionLabel::from_class(class);

        debug!(
            model = %self.classifier.name(),
            width = vector.len(),
            class = class,
            label = %label,
            "Prediction complete"
        );
        Ok(label)
    }

    /// Normalize a raw record and predict its label.
    pub fn predict_raw(&self, raw: &RawRecord) -> PredictResult<PredictionLabel> {
        let record = NormalizedRecord::from_raw(raw)?;
        self.predict(&record)
    }

    /// Predict from a parsed JSON request body.
    pub fn predict_json(&self, body: &Value) -> PredictResult<PredictionLabel> {
        let record = NormalizedRecord::from_json(body)?;
        self.predict(&record)
    }

    /// Log the layout once at startup.
    pub fn log_summary(&self) {
        info!(
            model = %self.classifier.name(),
            features = self.feature_count(),
            scaler_columns = self.scaler.n_features(),
            "Predictor ready"
        );
        debug!(order = ?self.extractor.feature_names(), "Model input order");
    }
}
