//! Pipeline configuration loaded from TOML.
//!
//! Every section falls back to the defaults below, so an empty file (or no
//! file at all) yields the standard 256 Hz x 4 s setup with the five rhythm
//! bands.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bands::BandLayout;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config at {path}: {source}")]
    ParseToml {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Sampling grid shared by every signal in a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    pub sample_rate_hz: u32,
    pub duration_secs: u32,
}

impl SignalConfig {
    /// Number of samples per signal.
    pub fn len(&self) -> usize {
        self.sample_rate_hz as usize * self.duration_secs as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 256,
            duration_secs: 4,
        }
    }
}

/// Half-open `[min, max)` range for uniform draws.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UniformRange {
    pub min: f64,
    pub max: f64,
}

impl UniformRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min < self.max
    }
}

/// Inclusive `min..=max` range for count draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountRange {
    pub min: usize,
    pub max: usize,
}

/// Distribution parameters of the training-mode synthesizer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisRanges {
    pub dominant_amplitude: UniformRange,
    pub distractor_count: CountRange,
    pub distractor_amplitude: UniformRange,
    pub noise_intensity: UniformRange,
}

impl Default for SynthesisRanges {
    fn default() -> Self {
        Self {
            dominant_amplitude: UniformRange::new(1.0, 1.6),
            distractor_count: CountRange { min: 1, max: 3 },
            distractor_amplitude: UniformRange::new(0.05, 0.35),
            noise_intensity: UniformRange::new(0.3, 1.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Number of labeled samples to synthesize.
    pub samples: usize,
    pub test_fraction: f64,
    pub split_seed: u64,
    pub synth_seed: u64,
    pub hidden_layers: Vec<usize>,
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f32,
    pub momentum: f32,
    pub l2_penalty: f32,
    pub model_seed: u64,
    pub model_out: PathBuf,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            samples: 5000,
            test_fraction: 0.2,
            split_seed: 0,
            synth_seed: 1,
            hidden_layers: vec![32, 16],
            epochs: 200,
            batch_size: 64,
            learning_rate: 0.01,
            momentum: 0.9,
            l2_penalty: 1e-4,
            model_seed: 0,
            model_out: PathBuf::from("model/band_mlp.json"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixtureConfig {
    pub seed: u64,
    pub noise: f64,
    pub noisy_noise: f64,
    pub out_dir: PathBuf,
}

impl Default for FixtureConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            noise: 0.55,
            noisy_noise: 1.25,
            out_dir: PathBuf::from("data/tests"),
        }
    }
}

/// Top-level configuration for the command-line tools.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub signal: SignalConfig,
    pub bands: BandLayout,
    pub synthesis: SynthesisRanges,
    pub training: TrainingConfig,
    pub fixtures: FixtureConfig,
}

impl PipelineConfig {
    /// Load from `path`, or return defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => load_from(path),
            None => Ok(Self::default()),
        }
    }

    /// Check cross-field constraints the serde layer cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.signal.is_empty() {
            return Err(ConfigError::Invalid(
                "signal length must be non-zero".to_string(),
            ));
        }
        let nyquist = self.signal.sample_rate_hz as f64 / 2.0;
        let (_, hi) = self.bands.span();
        if hi > nyquist {
            return Err(ConfigError::Invalid(format!(
                "band span ends at {hi} Hz, above the Nyquist frequency {nyquist} Hz"
            )));
        }
        if !(0.0..1.0).contains(&self.training.test_fraction) {
            return Err(ConfigError::Invalid(format!(
                "test_fraction {} must be in [0, 1)",
                self.training.test_fraction
            )));
        }
        Ok(())
    }
}

fn load_from(path: &Path) -> Result<PipelineConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config: PipelineConfig = toml::from_str(&text).map_err(|source| ConfigError::ParseToml {
        path: path.to_path_buf(),
        source,
    })?;
    config.validate()?;
    Ok(config)
}
