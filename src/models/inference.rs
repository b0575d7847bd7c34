//! Classifier invocation

use crate::error::{PredictError, PredictResult};
use crate::models::loader::{LoadedModel, ModelLoader};
use anyhow::Result;
use ort::value::{DynValue, Tensor};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// A fitted binary classifier accepting one fixed-width feature row.
pub trait Classifier: Send + Sync {
    /// Model name for logs
    fn name(&self) -> &str;

    /// Predict the class of a single row.
    fn predict_class(&self, features: &[f32]) -> PredictResult<i64>;
}

/// Classifier backed by an ONNX Runtime session
pub struct OnnxClassifier {
    /// Session `run` needs exclusive access
    model: Mutex<LoadedModel>,
    name: String,
}

impl OnnxClassifier {
    /// Wrap an already loaded model
    pub fn new(model: LoadedModel) -> Self {
        let name = model.name.clone();
        Self {
            model: Mutex::new(model),
            name,
        }
    }

    /// Load the classifier from an ONNX file
    pub fn from_path<P: AsRef<Path>>(path: P, onnx_threads: usize) -> Result<Self> {
        let loader = ModelLoader::with_threads(onnx_threads)?;
        let model = loader.load_model(path, "diabetes")?;
        Ok(Self::new(model))
    }
}

impl Classifier for OnnxClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn predict_class(&self, features: &[f32]) -> PredictResult<i64> {
        // Prepare input tensor - shape [1, num_features]
        let shape = vec![1_i64, features.len() as i64];
        let input_tensor = Tensor::from_array((shape, features.to_vec())).map_err(|e| {
            PredictError::Inference(format!("failed to create input tensor: {e}"))
        })?;

        let mut guard = lock_session(&self.model);
        let model = &mut *guard;

        let outputs = model
            .session
            .run(ort::inputs![&model.input_name => input_tensor])
            .map_err(|e| PredictError::Inference(e.to_string()))?;

        let class = match outputs.get(model.output_name.as_str()) {
            Some(output) => extract_class(output),
            None => outputs
                .iter()
                .filter(|(name, _)| !name.contains("prob"))
                .find_map(|(_, output)| extract_class(&output)),
        }
        .ok_or_else(|| {
            PredictError::Inference(format!(
                "model '{}' produced no readable class output",
                model.name
            ))
        })?;

        debug!(model = %model.name, class = class, "Classifier output");
        Ok(class)
    }
}

/// A panic inside `run` leaves the session intact; take the guard back from a
/// poisoned lock.
fn lock_session<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Read the first prediction from an int64 or float label tensor.
fn extract_class(output: &DynValue) -> Option<i64> {
    if let Ok((_, data)) = output.try_extract_tensor::<i64>() {
        return data.first().copied();
    }
    if let Ok((_, data)) = output.try_extract_tensor::<f32>() {
        // Float labels other than exactly 1.0 are not the positive class
        return data.first().map(|v| if *v == 1.0 { 1 } else { 0 });
    }
    None
}
