use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::spectrum::{PowerSpectrum, RealSpectrum};
use crate::bands::BandLayout;
use crate::config::SignalConfig;

/// Added to the normalization total so silent input stays finite.
pub const POWER_EPSILON: f64 = 1e-9;

#[derive(Debug, Error, PartialEq)]
pub enum FeatureError {
    #[error("Signal has {actual} samples; extractor is configured for {expected}")]
    LengthMismatch { expected: usize, actual: usize },
    #[error("Signal sample {index} is not finite")]
    NonFinite { index: usize },
}

/// Relative power per band, in band-layout order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    values: Vec<f32>,
}

impl FeatureVector {
    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn sum(&self) -> f32 {
        self.values.iter().sum()
    }

    /// Index of the band holding the most power.
    pub fn dominant_band(&self) -> Option<usize> {
        self.values
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(idx, _)| idx)
    }

    /// Ratio of the strongest band to the runner-up; low values mean a mixed spectrum.
    pub fn dominance_ratio(&self) -> f32 {
        let mut sorted = self.values.clone();
        sorted.sort_by(|a, b| b.total_cmp(a));
        let top = sorted.first().copied().unwrap_or(0.0);
        let second = sorted.get(1).copied().unwrap_or(0.0);
        top / (second + POWER_EPSILON as f32)
    }
}

impl From<Vec<f32>> for FeatureVector {
    fn from(values: Vec<f32>) -> Self {
        Self { values }
    }
}

/// Converts fixed-length signals into normalized band powers.
///
/// Built for a single sample rate and signal length; the FFT plan is reused
/// across calls.
pub struct BandPowerExtractor {
    bands: BandLayout,
    sample_rate_hz: u32,
    spectrum: RealSpectrum,
}

impl BandPowerExtractor {
    pub fn new(signal: SignalConfig, bands: BandLayout) -> Self {
        Self {
            spectrum: RealSpectrum::new(signal.len(), signal.sample_rate_hz),
            sample_rate_hz: signal.sample_rate_hz,
            bands,
        }
    }

    pub fn bands(&self) -> &BandLayout {
        &self.bands
    }

    pub fn signal_len(&self) -> usize {
        self.spectrum.len()
    }

    pub fn sample_rate_hz(&self) -> u32 {
        self.sample_rate_hz
    }

    pub fn extract(&self, signal: &[f32]) -> Result<FeatureVector, FeatureError> {
        let spectrum = self.power_spectrum(signal)?;
        let (span_lo, span_hi) = self.bands.span();
        let total = spectrum.band_sum(span_lo, span_hi) + POWER_EPSILON;
        let values = self
            .bands
            .bands()
            .iter()
            .map(|band| (spectrum.band_sum(band.lo_hz, band.hi_hz) / total) as f32)
            .collect();
        Ok(FeatureVector { values })
    }

    /// Validated one-sided PSD of `signal`.
    pub fn power_spectrum(&self, signal: &[f32]) -> Result<PowerSpectrum, FeatureError> {
        if signal.len() != self.spectrum.len() {
            return Err(FeatureError::LengthMismatch {
                expected: self.spectrum.len(),
                actual: signal.len(),
            });
        }
        if let Some(index) = signal.iter().position(|sample| !sample.is_finite()) {
            return Err(FeatureError::NonFinite { index });
        }
        Ok(self.spectrum.power(signal))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bands::Band;
    use std::f64::consts::TAU;

    fn extractor() -> BandPowerExtractor {
        BandPowerExtractor::new(SignalConfig::default(), BandLayout::rhythm())
    }

    fn sine(freq_hz: f64) -> Vec<f32> {
        (0..1024)
            .map(|n| (TAU * freq_hz * n as f64 / 256.0).sin() as f32)
            .collect()
    }

    #[test]
    fn pure_alpha_sine_lands_in_alpha() {
        let features = extractor().extract(&sine(10.0)).unwrap();
        let values = features.as_slice();
        assert_eq!(values.len(), 5);
        assert!(values[2] >= 0.95, "alpha fraction {}", values[2]);
        for (idx, &value) in values.iter().enumerate() {
            if idx != 2 {
                assert!(value <= 0.05, "band {idx} fraction {value}");
            }
        }
        assert_eq!(features.dominant_band(), Some(2));
    }

    #[test]
    fn extraction_is_repeatable() {
        let extractor = extractor();
        let signal = sine(22.5);
        assert_eq!(
            extractor.extract(&signal).unwrap(),
            extractor.extract(&signal).unwrap()
        );
    }

    #[test]
    fn each_band_captures_its_own_sine() {
        let extractor = extractor();
        for (freq, band) in [(2.0, 0), (6.0, 1), (10.0, 2), (20.0, 3), (40.0, 4)] {
            let features = extractor.extract(&sine(freq)).unwrap();
            assert!(features.as_slice()[band] >= 0.9, "{freq} Hz -> {features:?}");
        }
    }

    #[test]
    fn band_edge_goes_to_upper_band() {
        let features = extractor().extract(&sine(4.0)).unwrap();
        let values = features.as_slice();
        assert!(values[1] > 0.95, "theta fraction {}", values[1]);
        assert!(values[0] < 0.05, "delta fraction {}", values[0]);
    }

    #[test]
    fn silent_signal_yields_finite_uniform_zeros() {
        let features = extractor().extract(&vec![0.0; 1024]).unwrap();
        assert!(features.as_slice().iter().all(|v| v.is_finite()));
        let first = features.as_slice()[0];
        assert!(features.as_slice().iter().all(|v| (v - first).abs() < 1e-6));
    }

    #[test]
    fn energy_outside_span_is_ignored_by_the_total() {
        // 60 Hz is above the 45 Hz span: band fractions stay near zero
        // instead of being renormalized against the full spectrum.
        let features = extractor().extract(&sine(60.0)).unwrap();
        assert!(features.sum() < 0.05);
    }

    #[test]
    fn length_mismatch_fails_loudly() {
        let err = extractor().extract(&vec![0.0; 1000]).unwrap_err();
        assert_eq!(
            err,
            FeatureError::LengthMismatch {
                expected: 1024,
                actual: 1000
            }
        );
    }

    #[test]
    fn non_finite_samples_are_rejected() {
        let mut signal = sine(10.0);
        signal[17] = f32::NAN;
        assert_eq!(
            extractor().extract(&signal).unwrap_err(),
            FeatureError::NonFinite { index: 17 }
        );
    }

    #[test]
    fn gapped_layout_sums_below_one() {
        let layout = BandLayout::new(vec![Band::new("low", 1.0, 8.0), Band::new("high", 20.0, 45.0)])
            .unwrap();
        let extractor = BandPowerExtractor::new(SignalConfig::default(), layout);
        let features = extractor.extract(&sine(12.0)).unwrap();
        assert_eq!(features.len(), 2);
        assert!(features.sum() < 0.1);
    }

    #[test]
    fn dominance_ratio_flags_mixed_spectra() {
        let clean = FeatureVector {
            values: vec![0.05, 0.05, 0.8, 0.05, 0.05],
        };
        let mixed = FeatureVector {
            values: vec![0.02, 0.06, 0.45, 0.42, 0.05],
        };
        assert!(clean.dominance_ratio() > 10.0);
        assert!(mixed.dominance_ratio() < 1.5);
    }
}
