//! Labeled synthetic signal generation.
//!
//! A training epoch is one dominant sinusoid drawn from the target band, a few
//! weaker sinusoids from random bands, and white noise. Fixture signals use the
//! same rendering with explicitly supplied components. All draws come from the
//! caller's generator, so two contexts holding their own `StdRng` never
//! perturb each other.

mod component;

pub use component::{Component, ComponentSpec};

use rand::Rng;
use thiserror::Error;

use crate::bands::BandLayout;
use crate::config::{SignalConfig, SynthesisRanges, UniformRange};
use component::{random_phase, render};

#[derive(Debug, Error, PartialEq)]
pub enum SynthError {
    #[error("Band index {index} out of range for {bands} bands")]
    UnknownBand { index: usize, bands: usize },
    #[error("Invalid {name} range: {detail}")]
    InvalidRange { name: &'static str, detail: String },
    #[error("Signal length must be non-zero")]
    EmptySignal,
}

#[derive(Debug, Clone)]
pub struct SignalSynthesizer {
    signal: SignalConfig,
    bands: BandLayout,
    ranges: SynthesisRanges,
}

impl SignalSynthesizer {
    pub fn new(
        signal: SignalConfig,
        bands: BandLayout,
        ranges: SynthesisRanges,
    ) -> Result<Self, SynthError> {
        if signal.is_empty() {
            return Err(SynthError::EmptySignal);
        }
        check_uniform("dominant_amplitude", ranges.dominant_amplitude)?;
        check_uniform("distractor_amplitude", ranges.distractor_amplitude)?;
        check_uniform("noise_intensity", ranges.noise_intensity)?;
        if ranges.distractor_count.min > ranges.distractor_count.max {
            return Err(SynthError::InvalidRange {
                name: "distractor_count",
                detail: format!(
                    "{}..={} is empty",
                    ranges.distractor_count.min, ranges.distractor_count.max
                ),
            });
        }
        if ranges.distractor_amplitude.max > ranges.dominant_amplitude.min {
            return Err(SynthError::InvalidRange {
                name: "distractor_amplitude",
                detail: format!(
                    "upper bound {} exceeds dominant lower bound {}",
                    ranges.distractor_amplitude.max, ranges.dominant_amplitude.min
                ),
            });
        }
        Ok(Self {
            signal,
            bands,
            ranges,
        })
    }

    pub fn signal_config(&self) -> SignalConfig {
        self.signal
    }

    pub fn bands(&self) -> &BandLayout {
        &self.bands
    }

    /// Draw the dominant component for `target` followed by the distractors.
    pub fn draw_components<R: Rng>(
        &self,
        rng: &mut R,
        target: usize,
    ) -> Result<Vec<Component>, SynthError> {
        let band = self.bands.get(target).ok_or(SynthError::UnknownBand {
            index: target,
            bands: self.bands.len(),
        })?;
        let count = &self.ranges.distractor_count;
        let mut components = Vec::with_capacity(1 + count.max);
        components.push(Component {
            freq_hz: rng.random_range(band.lo_hz..band.hi_hz),
            amplitude: draw(rng, self.ranges.dominant_amplitude),
            phase: random_phase(rng),
        });

        let distractors = rng.random_range(count.min..=count.max);
        for _ in 0..distractors {
            let index = rng.random_range(0..self.bands.len());
            let Some(other) = self.bands.get(index) else {
                continue;
            };
            let freq_hz = rng.random_range(other.lo_hz..other.hi_hz);
            let amplitude = draw(rng, self.ranges.distractor_amplitude);
            components.push(Component {
                freq_hz,
                amplitude,
                phase: random_phase(rng),
            });
        }
        Ok(components)
    }

    /// Synthesize one training signal whose dominant rhythm lies in `target`.
    pub fn synth_epoch<R: Rng>(&self, rng: &mut R, target: usize) -> Result<Vec<f32>, SynthError> {
        let components = self.draw_components(rng, target)?;
        let noise = draw(rng, self.ranges.noise_intensity);
        Ok(render(
            &components,
            noise,
            self.signal.sample_rate_hz,
            self.signal.len(),
            rng,
        ))
    }

    /// Synthesize a signal from explicit components at a fixed noise level.
    pub fn synth_from_specs<R: Rng>(
        &self,
        rng: &mut R,
        specs: &[ComponentSpec],
        noise: f64,
    ) -> Vec<f32> {
        let components: Vec<Component> = specs
            .iter()
            .map(|spec| spec.with_random_phase(rng))
            .collect();
        render(
            &components,
            noise,
            self.signal.sample_rate_hz,
            self.signal.len(),
            rng,
        )
    }
}

fn draw<R: Rng>(rng: &mut R, range: UniformRange) -> f64 {
    rng.random_range(range.min..range.max)
}

fn check_uniform(name: &'static str, range: UniformRange) -> Result<(), SynthError> {
    if range.is_valid() && range.min >= 0.0 {
        Ok(())
    } else {
        Err(SynthError::InvalidRange {
            name,
            detail: format!("[{}, {}) is empty or negative", range.min, range.max),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CountRange;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn synthesizer() -> SignalSynthesizer {
        SignalSynthesizer::new(
            SignalConfig::default(),
            BandLayout::rhythm(),
            SynthesisRanges::default(),
        )
        .unwrap()
    }

    #[test]
    fn same_seed_reproduces_the_same_signals() {
        let synth = synthesizer();
        let mut a = StdRng::seed_from_u64(1);
        let mut b = StdRng::seed_from_u64(1);
        for label in 0..5 {
            assert_eq!(
                synth.synth_epoch(&mut a, label).unwrap(),
                synth.synth_epoch(&mut b, label).unwrap()
            );
        }
    }

    #[test]
    fn different_seeds_diverge() {
        let synth = synthesizer();
        let mut a = StdRng::seed_from_u64(1);
        let mut b = StdRng::seed_from_u64(2);
        assert_ne!(
            synth.synth_epoch(&mut a, 2).unwrap(),
            synth.synth_epoch(&mut b, 2).unwrap()
        );
    }

    #[test]
    fn epoch_has_configured_length() {
        let synth = synthesizer();
        let mut rng = StdRng::seed_from_u64(5);
        let x = synth.synth_epoch(&mut rng, 4).unwrap();
        assert_eq!(x.len(), 1024);
        assert!(x.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn components_respect_bands_and_ranges() {
        let synth = synthesizer();
        let layout = BandLayout::rhythm();
        let mut rng = StdRng::seed_from_u64(9);
        for round in 0..200 {
            let target = round % 5;
            let components = synth.draw_components(&mut rng, target).unwrap();
            let (dominant, rest) = components.split_first().unwrap();
            assert_eq!(layout.band_of(dominant.freq_hz), Some(target));
            assert!((1.0..1.6).contains(&dominant.amplitude));
            assert!((1..=3).contains(&rest.len()));
            for distractor in rest {
                assert!(layout.band_of(distractor.freq_hz).is_some());
                assert!((0.05..0.35).contains(&distractor.amplitude));
                assert!(distractor.amplitude < dominant.amplitude);
            }
        }
    }

    #[test]
    fn unknown_band_is_an_error() {
        let synth = synthesizer();
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(
            synth.synth_epoch(&mut rng, 5).unwrap_err(),
            SynthError::UnknownBand { index: 5, bands: 5 }
        );
    }

    #[test]
    fn invalid_ranges_are_rejected_up_front() {
        let mut ranges = SynthesisRanges::default();
        ranges.distractor_count = CountRange { min: 3, max: 1 };
        let err = SignalSynthesizer::new(SignalConfig::default(), BandLayout::rhythm(), ranges)
            .unwrap_err();
        assert!(matches!(
            err,
            SynthError::InvalidRange {
                name: "distractor_count",
                ..
            }
        ));

        let mut ranges = SynthesisRanges::default();
        ranges.distractor_amplitude = UniformRange::new(0.5, 1.2);
        assert!(SignalSynthesizer::new(SignalConfig::default(), BandLayout::rhythm(), ranges).is_err());
    }

    #[test]
    fn fixture_mode_uses_supplied_components() {
        let synth = synthesizer();
        let mut rng = StdRng::seed_from_u64(0);
        let x = synth.synth_from_specs(&mut rng, &[ComponentSpec::new(10.0, 1.0)], 0.0);
        let peak = x.iter().fold(0.0_f32, |acc, v| acc.max(v.abs()));
        assert!(peak <= 1.0 + 1e-6);
        assert!(peak > 0.9);
    }

    fn sample_std(values: &[f64]) -> f64 {
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64)
            .sqrt()
    }

    #[test]
    fn epoch_noise_is_scaled_by_the_drawn_intensity() {
        let synth = synthesizer();
        let signal = SignalConfig::default();
        for seed in 0..8 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut replay = rng.clone();
            let epoch = synth.synth_epoch(&mut rng, (seed % 5) as usize).unwrap();

            let components = synth.draw_components(&mut replay, (seed % 5) as usize).unwrap();
            let intensity = draw(&mut replay, SynthesisRanges::default().noise_intensity);
            let clean = super::component::render(
                &components,
                0.0,
                signal.sample_rate_hz,
                signal.len(),
                &mut StdRng::seed_from_u64(0),
            );
            let residual: Vec<f64> = epoch
                .iter()
                .zip(&clean)
                .map(|(&e, &c)| e as f64 - c as f64)
                .collect();
            let std = sample_std(&residual);
            assert!((0.3..1.0).contains(&intensity));
            assert!(
                (std - intensity).abs() < 0.1 * intensity,
                "seed {seed}: residual std {std}, intensity {intensity}"
            );
        }
    }
}
