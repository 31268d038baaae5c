//! Labeled feature datasets built from synthetic signals.

mod builder;
mod split;

pub use builder::DatasetBuilder;
pub use split::{Split, stratified_split};

use ndarray::{Array2, ArrayView1, ArrayView2, Axis};
use thiserror::Error;

use crate::analysis::{FeatureError, FeatureVector};
use crate::synth::SynthError;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Dataset must contain at least one sample")]
    Empty,
    #[error("Class count {classes} must be between 1 and the band count {bands}")]
    InvalidClassCount { classes: usize, bands: usize },
    #[error("Synthesizer and extractor disagree: {0}")]
    ConfigMismatch(String),
    #[error("Dataset shape mismatch: {0}")]
    Shape(String),
    #[error("Invalid test fraction {0}; expected a value in [0, 1)")]
    InvalidFraction(f64),
    #[error(transparent)]
    Synth(#[from] SynthError),
    #[error(transparent)]
    Feature(#[from] FeatureError),
}

/// Feature vector paired with the index of its intended dominant band.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledSample {
    pub features: FeatureVector,
    pub label: usize,
}

/// Row-per-sample feature matrix with class labels, in generation order.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    features: Array2<f32>,
    labels: Vec<usize>,
    classes: Vec<String>,
}

impl Dataset {
    pub fn new(
        features: Array2<f32>,
        labels: Vec<usize>,
        classes: Vec<String>,
    ) -> Result<Self, DatasetError> {
        if features.nrows() != labels.len() {
            return Err(DatasetError::Shape(format!(
                "{} feature rows but {} labels",
                features.nrows(),
                labels.len()
            )));
        }
        if let Some(&label) = labels.iter().find(|&&label| label >= classes.len()) {
            return Err(DatasetError::Shape(format!(
                "label {label} out of range for {} classes",
                classes.len()
            )));
        }
        Ok(Self {
            features,
            labels,
            classes,
        })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn feature_len(&self) -> usize {
        self.features.ncols()
    }

    pub fn features(&self) -> ArrayView2<'_, f32> {
        self.features.view()
    }

    pub fn row(&self, index: usize) -> ArrayView1<'_, f32> {
        self.features.row(index)
    }

    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    pub fn sample(&self, index: usize) -> Option<LabeledSample> {
        let label = *self.labels.get(index)?;
        Some(LabeledSample {
            features: FeatureVector::from(self.features.row(index).to_vec()),
            label,
        })
    }

    /// Number of samples per class, indexed by label.
    pub fn label_counts(&self) -> Vec<usize> {
        let mut counts = vec![0usize; self.classes.len()];
        for &label in &self.labels {
            counts[label] += 1;
        }
        counts
    }

    /// Copy the given rows, in the given order, into a new dataset.
    pub fn select(&self, indices: &[usize]) -> Dataset {
        Dataset {
            features: self.features.select(Axis(0), indices),
            labels: indices.iter().map(|&idx| self.labels[idx]).collect(),
            classes: self.classes.clone(),
        }
    }
}
