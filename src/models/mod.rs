//! Frozen model artifacts: classifier and numeric scaler

pub mod inference;
pub mod loader;
pub mod scaler;

pub use inference::{Classifier, OnnxClassifier};
pub use loader::ModelLoader;
pub use scaler::StandardScaler;
