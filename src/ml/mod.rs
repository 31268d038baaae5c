//! Classifier training on band-power feature matrices.
//!
//! The pipeline mirrors a scaler + MLP stack: features are standardized with
//! statistics from the training split, then fed to a small ReLU network with a
//! softmax head. Everything is seeded, so a fixed configuration retrains to the
//! same weights.

pub mod metrics;
pub mod mlp;
mod pipeline;
mod scaler;

pub use pipeline::{Evaluation, FittedPipeline, TrainingPipeline};
pub use scaler::{MIN_STD, StandardScaler};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrainError {
    #[error("Training data is empty")]
    Empty,
    #[error("Need at least 2 classes, got {0}")]
    TooFewClasses(usize),
    #[error("Expected {expected} features per row, got {actual}")]
    FeatureLenMismatch { expected: usize, actual: usize },
    #[error("Label {label} out of range for {classes} classes")]
    LabelOutOfRange { label: usize, classes: usize },
    #[error("Epoch count must be positive")]
    ZeroEpochs,
    #[error("Training data shape mismatch: {0}")]
    Shape(String),
}
