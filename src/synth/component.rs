use std::f64::consts::TAU;

use rand::Rng;
use rand_distr::{Distribution, StandardNormal};
use serde::{Deserialize, Serialize};

/// One sinusoid contributing to a synthesized signal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Component {
    pub freq_hz: f64,
    pub amplitude: f64,
    /// Radians in `[0, 2π)`.
    pub phase: f64,
}

/// Frequency/amplitude pair supplied explicitly for fixture signals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComponentSpec {
    pub freq_hz: f64,
    pub amplitude: f64,
}

impl ComponentSpec {
    pub const fn new(freq_hz: f64, amplitude: f64) -> Self {
        Self { freq_hz, amplitude }
    }

    /// Attach a freshly drawn phase.
    pub fn with_random_phase<R: Rng>(self, rng: &mut R) -> Component {
        Component {
            freq_hz: self.freq_hz,
            amplitude: self.amplitude,
            phase: random_phase(rng),
        }
    }
}

pub(crate) fn random_phase<R: Rng>(rng: &mut R) -> f64 {
    rng.random_range(0.0..TAU)
}

/// Sum `components` over the sampling grid and add scaled white noise.
///
/// Accumulates in `f64`; the cast to `f32` happens once per sample at the end.
pub(crate) fn render<R: Rng>(
    components: &[Component],
    noise: f64,
    sample_rate_hz: u32,
    len: usize,
    rng: &mut R,
) -> Vec<f32> {
    let fs = sample_rate_hz as f64;
    let mut acc = vec![0.0_f64; len];
    for component in components {
        let omega = TAU * component.freq_hz;
        for (n, value) in acc.iter_mut().enumerate() {
            let t = n as f64 / fs;
            *value += component.amplitude * (omega * t + component.phase).sin();
        }
    }
    for value in acc.iter_mut() {
        let z: f64 = StandardNormal.sample(rng);
        *value += noise * z;
    }
    acc.into_iter().map(|value| value as f32).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn noiseless_render_matches_closed_form() {
        let mut rng = StdRng::seed_from_u64(3);
        let component = Component {
            freq_hz: 5.0,
            amplitude: 2.0,
            phase: 0.5,
        };
        let x = render(&[component], 0.0, 100, 50, &mut rng);
        assert_eq!(x.len(), 50);
        for (n, &value) in x.iter().enumerate() {
            let expected = 2.0 * (TAU * 5.0 * n as f64 / 100.0 + 0.5).sin();
            assert!((value as f64 - expected).abs() < 1e-6);
        }
    }

    #[test]
    fn phases_stay_in_one_turn() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..1000 {
            let phase = random_phase(&mut rng);
            assert!((0.0..TAU).contains(&phase));
        }
    }

    #[test]
    fn added_noise_has_the_requested_spread() {
        let component = Component {
            freq_hz: 10.0,
            amplitude: 1.0,
            phase: 0.0,
        };
        let clean = render(&[component], 0.0, 256, 4096, &mut StdRng::seed_from_u64(0));
        let noisy = render(&[component], 0.5, 256, 4096, &mut StdRng::seed_from_u64(4));
        let residual: Vec<f64> = noisy
            .iter()
            .zip(&clean)
            .map(|(&n, &c)| n as f64 - c as f64)
            .collect();
        let mean = residual.iter().sum::<f64>() / residual.len() as f64;
        let std = (residual.iter().map(|r| (r - mean).powi(2)).sum::<f64>()
            / (residual.len() - 1) as f64)
            .sqrt();
        assert!((std - 0.5).abs() < 0.05, "residual std {std}");
        assert!(mean.abs() < 0.05, "residual mean {mean}");
    }
}
