//! End-to-end training run: synthesize, extract, split, fit, evaluate, export.

use std::path::PathBuf;

use rand::SeedableRng;
use rand::rngs::StdRng;
use thiserror::Error;
use tracing::{info, warn};

use crate::analysis::BandPowerExtractor;
use crate::config::{ConfigError, PipelineConfig, TrainingConfig};
use crate::dataset::{DatasetBuilder, DatasetError, stratified_split};
use crate::export::{ExportError, ModelExporter};
use crate::ml::mlp::TrainOptions;
use crate::ml::{Evaluation, FittedPipeline, TrainError, TrainingPipeline};
use crate::synth::{SignalSynthesizer, SynthError};

/// Rows checked for parity between the pipeline and its exported graph.
const PARITY_PROBES: usize = 32;

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Synth(#[from] SynthError),
    #[error(transparent)]
    Dataset(#[from] DatasetError),
    #[error(transparent)]
    Train(#[from] TrainError),
    #[error(transparent)]
    Export(#[from] ExportError),
}

impl From<&TrainingConfig> for TrainOptions {
    fn from(config: &TrainingConfig) -> Self {
        Self {
            hidden_layers: config.hidden_layers.clone(),
            epochs: config.epochs,
            batch_size: config.batch_size,
            learning_rate: config.learning_rate,
            momentum: config.momentum,
            l2_penalty: config.l2_penalty,
            seed: config.model_seed,
        }
    }
}

/// Outcome of [`run_training`].
#[derive(Debug, Clone)]
pub struct TrainingReport {
    pub pipeline: FittedPipeline,
    pub evaluation: Evaluation,
    pub train_len: usize,
    pub test_len: usize,
    /// Where the graph was written, when export was requested.
    pub model_path: Option<PathBuf>,
}

/// Run the full training workflow described by `config`.
///
/// The exported graph is written to `config.training.model_out` when
/// `export` is set.
pub fn run_training(config: &PipelineConfig, export: bool) -> Result<TrainingReport, RunError> {
    config.validate()?;
    let synth = SignalSynthesizer::new(config.signal, config.bands.clone(), config.synthesis)?;
    let extractor = BandPowerExtractor::new(config.signal, config.bands.clone());
    let builder = DatasetBuilder::new(&synth, &extractor)?;

    let training = &config.training;
    let mut rng = StdRng::seed_from_u64(training.synth_seed);
    let dataset = builder.build(&mut rng, training.samples, config.bands.len())?;
    let split = stratified_split(&dataset, training.test_fraction, training.split_seed)?;
    info!(
        "Split {} samples into {} train / {} test",
        dataset.len(),
        split.train.len(),
        split.test.len()
    );

    let pipeline = TrainingPipeline::new(TrainOptions::from(training)).fit(&split.train)?;
    let evaluation = if split.test.is_empty() {
        warn!("Test split is empty; reporting training accuracy instead");
        pipeline.evaluate(&split.train)?
    } else {
        pipeline.evaluate(&split.test)?
    };
    info!("Held-out accuracy {:.4}", evaluation.accuracy);

    let model_path = if export {
        let source = if split.test.is_empty() {
            &split.train
        } else {
            &split.test
        };
        let probes: Vec<Vec<f32>> = source
            .features()
            .rows()
            .into_iter()
            .take(PARITY_PROBES)
            .map(|row| row.to_vec())
            .collect();
        ModelExporter::new(config.bands.clone(), config.signal)
            .with_test_accuracy(evaluation.accuracy)
            .export(&pipeline, &training.model_out, &probes)?;
        Some(training.model_out.clone())
    } else {
        None
    };

    Ok(TrainingReport {
        pipeline,
        evaluation,
        train_len: split.train.len(),
        test_len: split.test.len(),
        model_path,
    })
}
