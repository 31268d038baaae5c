//! Frequency band layout shared by synthesis and feature extraction.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A named half-open frequency interval `[lo_hz, hi_hz)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub name: String,
    pub lo_hz: f64,
    pub hi_hz: f64,
}

impl Band {
    pub fn new(name: impl Into<String>, lo_hz: f64, hi_hz: f64) -> Self {
        Self {
            name: name.into(),
            lo_hz,
            hi_hz,
        }
    }

    /// Half-open membership test: an edge frequency belongs to the upper band.
    pub fn contains(&self, freq_hz: f64) -> bool {
        freq_hz >= self.lo_hz && freq_hz < self.hi_hz
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum BandLayoutError {
    #[error("Band layout must contain at least one band")]
    Empty,
    #[error("Band {name} has invalid edges [{lo_hz}, {hi_hz})")]
    InvalidEdges { name: String, lo_hz: f64, hi_hz: f64 },
}

/// Ordered, immutable list of bands. Band index doubles as class label.
///
/// Overlaps and gaps between bands are not rejected; the caller keeps the
/// bands disjoint so the normalized powers stay meaningful.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Band>", into = "Vec<Band>")]
pub struct BandLayout {
    bands: Vec<Band>,
}

impl BandLayout {
    pub fn new(bands: Vec<Band>) -> Result<Self, BandLayoutError> {
        if bands.is_empty() {
            return Err(BandLayoutError::Empty);
        }
        for band in &bands {
            let finite = band.lo_hz.is_finite() && band.hi_hz.is_finite();
            if !finite || band.lo_hz < 0.0 || band.lo_hz >= band.hi_hz {
                return Err(BandLayoutError::InvalidEdges {
                    name: band.name.clone(),
                    lo_hz: band.lo_hz,
                    hi_hz: band.hi_hz,
                });
            }
        }
        Ok(Self { bands })
    }

    /// The five classic rhythm bands covering 1-45 Hz.
    pub fn rhythm() -> Self {
        Self {
            bands: vec![
                Band::new("delta", 1.0, 4.0),
                Band::new("theta", 4.0, 8.0),
                Band::new("alpha", 8.0, 13.0),
                Band::new("beta", 13.0, 30.0),
                Band::new("gamma", 30.0, 45.0),
            ],
        }
    }

    pub fn len(&self) -> usize {
        self.bands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }

    pub fn bands(&self) -> &[Band] {
        &self.bands
    }

    pub fn get(&self, index: usize) -> Option<&Band> {
        self.bands.get(index)
    }

    pub fn names(&self) -> Vec<String> {
        self.bands.iter().map(|band| band.name.clone()).collect()
    }

    /// Index of the first band containing `freq_hz`.
    pub fn band_of(&self, freq_hz: f64) -> Option<usize> {
        self.bands.iter().position(|band| band.contains(freq_hz))
    }

    /// `[min lo, max hi)` over all bands; the normalization range.
    pub fn span(&self) -> (f64, f64) {
        let lo = self
            .bands
            .iter()
            .map(|band| band.lo_hz)
            .fold(f64::INFINITY, f64::min);
        let hi = self
            .bands
            .iter()
            .map(|band| band.hi_hz)
            .fold(f64::NEG_INFINITY, f64::max);
        (lo, hi)
    }
}

impl Default for BandLayout {
    fn default() -> Self {
        Self::rhythm()
    }
}

impl TryFrom<Vec<Band>> for BandLayout {
    type Error = BandLayoutError;

    fn try_from(bands: Vec<Band>) -> Result<Self, Self::Error> {
        Self::new(bands)
    }
}

impl From<BandLayout> for Vec<Band> {
    fn from(layout: BandLayout) -> Self {
        layout.bands
    }
}
