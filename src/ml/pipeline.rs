use serde::{Deserialize, Serialize};
use tracing::info;

use super::metrics::{ConfusionMatrix, PerClassStats, accuracy, precision_recall_by_class};
use super::mlp::{MlpModel, TrainOptions, argmax, train_mlp};
use super::scaler::StandardScaler;
use super::TrainError;
use crate::dataset::Dataset;

/// Scaler + MLP training recipe.
#[derive(Debug, Clone, Default)]
pub struct TrainingPipeline {
    options: TrainOptions,
}

impl TrainingPipeline {
    pub fn new(options: TrainOptions) -> Self {
        Self { options }
    }

    pub fn fit(&self, train: &Dataset) -> Result<FittedPipeline, TrainError> {
        let scaler = StandardScaler::fit(train.features()).ok_or(TrainError::Empty)?;
        let x: Vec<Vec<f32>> = train
            .features()
            .rows()
            .into_iter()
            .map(|row| scaler.transform_view(row))
            .collect();
        info!(
            "Training MLP {:?} on {} samples for {} epochs",
            self.options.hidden_layers,
            x.len(),
            self.options.epochs
        );
        let mlp = train_mlp(&x, train.labels(), train.classes(), &self.options)?;
        Ok(FittedPipeline { scaler, mlp })
    }
}

/// Standardization followed by the trained classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedPipeline {
    pub scaler: StandardScaler,
    pub mlp: MlpModel,
}

/// Held-out evaluation summary.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub accuracy: f32,
    pub confusion: ConfusionMatrix,
    pub per_class: Vec<PerClassStats>,
}

impl FittedPipeline {
    pub fn feature_len(&self) -> usize {
        self.scaler.len()
    }

    pub fn classes(&self) -> &[String] {
        &self.mlp.classes
    }

    /// Class probabilities; empty when `features` has the wrong length.
    pub fn predict_proba(&self, features: &[f32]) -> Vec<f32> {
        if features.len() != self.feature_len() {
            return Vec::new();
        }
        self.mlp.predict_proba(&self.scaler.transform(features))
    }

    pub fn predict(&self, features: &[f32]) -> usize {
        argmax(&self.predict_proba(features))
    }

    pub fn evaluate(&self, dataset: &Dataset) -> Result<Evaluation, TrainError> {
        if dataset.feature_len() != self.feature_len() {
            return Err(TrainError::FeatureLenMismatch {
                expected: self.feature_len(),
                actual: dataset.feature_len(),
            });
        }
        let mut confusion = ConfusionMatrix::new(self.mlp.class_count());
        for (row, &truth) in dataset.features().rows().into_iter().zip(dataset.labels()) {
            let scaled = self.scaler.transform_view(row);
            confusion.add(truth, self.mlp.predict_class_index(&scaled));
        }
        Ok(Evaluation {
            accuracy: accuracy(&confusion),
            per_class: precision_recall_by_class(&confusion),
            confusion,
        })
    }

    /// Mean accuracy on `dataset`.
    pub fn score(&self, dataset: &Dataset) -> Result<f32, TrainError> {
        Ok(self.evaluate(dataset)?.accuracy)
    }
}
