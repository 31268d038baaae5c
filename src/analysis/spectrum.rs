use std::sync::Arc;

use rustfft::{Fft, FftPlanner, num_complex::Complex};

/// One-sided power spectral density of a real signal.
#[derive(Debug, Clone)]
pub struct PowerSpectrum {
    /// Bin centre frequencies in Hz, `k * fs / N` for `k in 0..=N/2`.
    pub freqs_hz: Vec<f64>,
    /// `|X[k]|² / N` for the same bins.
    pub power: Vec<f64>,
}

impl PowerSpectrum {
    /// Sum of the power in bins whose frequency lies in `[lo_hz, hi_hz)`.
    pub fn band_sum(&self, lo_hz: f64, hi_hz: f64) -> f64 {
        self.freqs_hz
            .iter()
            .zip(self.power.iter())
            .filter(|(freq, _)| **freq >= lo_hz && **freq < hi_hz)
            .map(|(_, power)| *power)
            .sum()
    }
}

/// Forward real-input transform with a plan fixed to one signal length.
pub(crate) struct RealSpectrum {
    len: usize,
    sample_rate_hz: f64,
    fft: Arc<dyn Fft<f64>>,
}

impl RealSpectrum {
    pub(crate) fn new(len: usize, sample_rate_hz: u32) -> Self {
        let mut planner = FftPlanner::<f64>::new();
        Self {
            len,
            sample_rate_hz: sample_rate_hz as f64,
            fft: planner.plan_fft_forward(len),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Caller guarantees `samples.len() == self.len()`.
    pub(crate) fn power(&self, samples: &[f32]) -> PowerSpectrum {
        let mut buffer: Vec<Complex<f64>> = samples
            .iter()
            .map(|&sample| Complex::new(sample as f64, 0.0))
            .collect();
        self.fft.process(&mut buffer);

        let n = self.len as f64;
        let bins = self.len / 2 + 1;
        let freqs_hz = (0..bins)
            .map(|k| k as f64 * self.sample_rate_hz / n)
            .collect();
        let power = buffer[..bins].iter().map(|c| c.norm_sqr() / n).collect();
        PowerSpectrum { freqs_hz, power }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bin_frequencies_follow_resolution() {
        let spectrum = RealSpectrum::new(1024, 256).power(&vec![0.0; 1024]);
        assert_eq!(spectrum.freqs_hz.len(), 513);
        assert_eq!(spectrum.freqs_hz[16], 4.0);
        assert_eq!(spectrum.freqs_hz[512], 128.0);
    }

    #[test]
    fn parseval_holds_for_one_sided_power() {
        let n = 256;
        let samples: Vec<f32> = (0..n).map(|i| ((i * 7) % 13) as f32 / 13.0 - 0.5).collect();
        let spectrum = RealSpectrum::new(n, 128).power(&samples);
        // Full-spectrum energy: DC and Nyquist once, every other bin twice.
        let mut one_sided = spectrum.power[0] + spectrum.power[n / 2];
        one_sided += 2.0 * spectrum.power[1..n / 2].iter().sum::<f64>();
        let time_energy: f64 = samples.iter().map(|&x| (x as f64) * (x as f64)).sum();
        assert!((one_sided - time_energy).abs() < 1e-9 * time_energy.max(1.0));
    }

    #[test]
    fn band_sum_is_half_open() {
        let spectrum = PowerSpectrum {
            freqs_hz: vec![0.0, 1.0, 2.0, 3.0],
            power: vec![1.0, 2.0, 4.0, 8.0],
        };
        assert_eq!(spectrum.band_sum(1.0, 3.0), 6.0);
        assert_eq!(spectrum.band_sum(3.0, 4.0), 8.0);
    }
}
