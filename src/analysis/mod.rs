//! Frequency-domain feature extraction.
//!
//! Signals are transformed with a real-input FFT in double precision, turned
//! into a one-sided PSD, and aggregated per band. Band powers are normalized
//! by the power inside the layout's overall span (not the whole spectrum) and
//! only cast to `f32` on output.

mod bandpower;
mod spectrum;

pub use bandpower::{BandPowerExtractor, FeatureError, FeatureVector, POWER_EPSILON};
pub use spectrum::PowerSpectrum;
