//! Raw signal fixtures for downstream smoke tests.
//!
//! Each preset is rendered in fixture mode (explicit components, random
//! phases, fixed noise) and written as a single-column text file.

use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use rand::SeedableRng;
use rand::rngs::StdRng;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::FixtureConfig;
use crate::synth::{ComponentSpec, SignalSynthesizer};

#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("Failed to create fixture directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write fixture {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to read signal {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid value on line {line} of {path}")]
    Parse { path: PathBuf, line: usize },
}

/// One named fixture signal.
#[derive(Debug, Clone, PartialEq)]
pub struct FixturePreset {
    pub file_name: &'static str,
    pub components: Vec<ComponentSpec>,
    /// Rendered with the elevated noise level instead of the default one.
    pub noisy: bool,
}

impl FixturePreset {
    fn new(file_name: &'static str, components: &[(f64, f64)], noisy: bool) -> Self {
        Self {
            file_name,
            components: components
                .iter()
                .map(|&(freq, amp)| ComponentSpec::new(freq, amp))
                .collect(),
            noisy,
        }
    }
}

/// The standard preset list, in generation order.
pub fn default_presets() -> Vec<FixturePreset> {
    vec![
        FixturePreset::new("delta_dominant.csv", &[(2.0, 1.3), (6.0, 0.2), (10.0, 0.1)], false),
        FixturePreset::new("theta_dominant.csv", &[(6.0, 1.3), (2.0, 0.2), (10.0, 0.1)], false),
        FixturePreset::new("alpha_dominant.csv", &[(10.0, 1.3), (6.0, 0.2), (20.0, 0.1)], false),
        FixturePreset::new("beta_dominant.csv", &[(20.0, 1.3), (10.0, 0.2), (40.0, 0.1)], false),
        FixturePreset::new("gamma_dominant.csv", &[(40.0, 1.1), (20.0, 0.2), (10.0, 0.1)], false),
        FixturePreset::new(
            "mixed_alpha_beta.csv",
            &[(10.0, 0.9), (20.0, 0.9), (6.0, 0.15)],
            false,
        ),
        FixturePreset::new("noisy.csv", &[(10.0, 0.25), (20.0, 0.25), (40.0, 0.2)], true),
    ]
}

/// Writes fixture presets using a generator seeded from [`FixtureConfig::seed`].
pub struct FixtureWriter<'a> {
    synth: &'a SignalSynthesizer,
    config: FixtureConfig,
}

impl<'a> FixtureWriter<'a> {
    pub fn new(synth: &'a SignalSynthesizer, config: FixtureConfig) -> Self {
        Self { synth, config }
    }

    /// Render every preset into `out_dir`; returns the written paths in order.
    pub fn write_all(
        &self,
        presets: &[FixturePreset],
        out_dir: &Path,
    ) -> Result<Vec<PathBuf>, FixtureError> {
        std::fs::create_dir_all(out_dir).map_err(|source| FixtureError::CreateDir {
            path: out_dir.to_path_buf(),
            source,
        })?;
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let mut written = Vec::with_capacity(presets.len());
        for preset in presets {
            let noise = if preset.noisy {
                self.config.noisy_noise
            } else {
                self.config.noise
            };
            let signal = self.synth.synth_from_specs(&mut rng, &preset.components, noise);
            let path = out_dir.join(preset.file_name);
            write_signal_csv(&path, &signal)?;
            debug!("Wrote {} samples to {}", signal.len(), path.display());
            written.push(path);
        }
        info!("Wrote {} fixtures to {}", written.len(), out_dir.display());
        Ok(written)
    }
}

/// One value per line in `%.18e` style scientific notation, no header.
pub fn write_signal_csv(path: &Path, signal: &[f32]) -> Result<(), FixtureError> {
    let write_err = |source| FixtureError::Write {
        path: path.to_path_buf(),
        source,
    };
    let file = std::fs::File::create(path).map_err(write_err)?;
    let mut out = BufWriter::new(file);
    for &value in signal {
        writeln!(out, "{}", format_sci(value as f64)).map_err(write_err)?;
    }
    out.flush().map_err(write_err)
}

/// Read the first comma-delimited cell of every non-empty line.
pub fn read_signal_csv(path: &Path) -> Result<Vec<f32>, FixtureError> {
    let text = std::fs::read_to_string(path).map_err(|source| FixtureError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut values = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let cell = line.split(',').next().unwrap_or_default().trim();
        let value = cell.parse::<f32>().map_err(|_| FixtureError::Parse {
            path: path.to_path_buf(),
            line: idx + 1,
        })?;
        values.push(value);
    }
    Ok(values)
}

/// `{:.18e}` with a signed, at least two-digit exponent (`1.5e0` -> `1.5e+00`).
fn format_sci(value: f64) -> String {
    let raw = format!("{value:.18e}");
    match raw.split_once('e') {
        Some((mantissa, exp)) => {
            let (sign, digits) = match exp.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exp),
            };
            format!("{mantissa}e{sign}{digits:0>2}")
        }
        None => raw,
    }
}
