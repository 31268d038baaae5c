use ndarray::Array2;
use rand::Rng;
use tracing::{debug, info};

use super::{Dataset, DatasetError, LabeledSample};
use crate::analysis::BandPowerExtractor;
use crate::synth::SignalSynthesizer;

const PROGRESS_EVERY: usize = 1000;

/// Cycles class labels, synthesizes one signal per label and extracts its
/// features.
pub struct DatasetBuilder<'a> {
    synth: &'a SignalSynthesizer,
    extractor: &'a BandPowerExtractor,
}

impl<'a> DatasetBuilder<'a> {
    pub fn new(
        synth: &'a SignalSynthesizer,
        extractor: &'a BandPowerExtractor,
    ) -> Result<Self, DatasetError> {
        let signal = synth.signal_config();
        if signal.len() != extractor.signal_len() {
            return Err(DatasetError::ConfigMismatch(format!(
                "synthesizer emits {} samples, extractor expects {}",
                signal.len(),
                extractor.signal_len()
            )));
        }
        if signal.sample_rate_hz != extractor.sample_rate_hz() {
            return Err(DatasetError::ConfigMismatch(format!(
                "synthesizer runs at {} Hz, extractor at {} Hz",
                signal.sample_rate_hz,
                extractor.sample_rate_hz()
            )));
        }
        if synth.bands() != extractor.bands() {
            return Err(DatasetError::ConfigMismatch(
                "band layouts differ".to_string(),
            ));
        }
        Ok(Self { synth, extractor })
    }

    /// One synthesized, feature-extracted sample for `label`.
    pub fn labeled_sample<R: Rng>(
        &self,
        rng: &mut R,
        label: usize,
    ) -> Result<LabeledSample, DatasetError> {
        let signal = self.synth.synth_epoch(rng, label)?;
        let features = self.extractor.extract(&signal)?;
        Ok(LabeledSample { features, label })
    }

    /// Build `sample_count` samples with `label = index % class_count`.
    pub fn build<R: Rng>(
        &self,
        rng: &mut R,
        sample_count: usize,
        class_count: usize,
    ) -> Result<Dataset, DatasetError> {
        let bands = self.extractor.bands();
        if sample_count == 0 {
            return Err(DatasetError::Empty);
        }
        if class_count == 0 || class_count > bands.len() {
            return Err(DatasetError::InvalidClassCount {
                classes: class_count,
                bands: bands.len(),
            });
        }

        let mut features = Array2::<f32>::zeros((sample_count, bands.len()));
        let mut labels = Vec::with_capacity(sample_count);
        for index in 0..sample_count {
            let sample = self.labeled_sample(rng, index % class_count)?;
            for (dst, src) in features
                .row_mut(index)
                .iter_mut()
                .zip(sample.features.as_slice())
            {
                *dst = *src;
            }
            labels.push(sample.label);
            if (index + 1) % PROGRESS_EVERY == 0 {
                debug!("Built {}/{} samples", index + 1, sample_count);
            }
        }

        let classes = bands.names().into_iter().take(class_count).collect();
        let dataset = Dataset::new(features, labels, classes)?;
        info!(
            "Built dataset with {} samples across {} classes",
            dataset.len(),
            class_count
        );
        Ok(dataset)
    }
}
