use ndarray::{ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

/// Floor applied to the standard deviation before dividing.
pub const MIN_STD: f32 = 1e-6;

/// Per-feature standardization `(x - mean) / std` with population std.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f32>,
    pub std: Vec<f32>,
}

impl StandardScaler {
    /// Fit on the rows of `x`; `None` when there are no rows.
    pub fn fit(x: ArrayView2<'_, f32>) -> Option<Self> {
        let n = x.nrows();
        if n == 0 {
            return None;
        }
        let d = x.ncols();
        let mut mean = vec![0.0f64; d];
        for row in x.rows() {
            for (m, &v) in mean.iter_mut().zip(row.iter()) {
                *m += v as f64;
            }
        }
        for m in &mut mean {
            *m /= n as f64;
        }
        let mut var = vec![0.0f64; d];
        for row in x.rows() {
            for i in 0..d {
                let diff = row[i] as f64 - mean[i];
                var[i] += diff * diff;
            }
        }
        Some(Self {
            mean: mean.iter().map(|&m| m as f32).collect(),
            std: var.iter().map(|&v| (v / n as f64).sqrt() as f32).collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.mean.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mean.is_empty()
    }

    /// Multiplicative factors `1 / max(std, MIN_STD)`.
    pub fn inverse_scale(&self) -> Vec<f32> {
        self.std.iter().map(|&s| 1.0 / s.max(MIN_STD)).collect()
    }

    pub fn transform(&self, row: &[f32]) -> Vec<f32> {
        row.iter()
            .zip(self.mean.iter().zip(&self.std))
            .map(|(&x, (&m, &s))| (x - m) / s.max(MIN_STD))
            .collect()
    }

    pub fn transform_view(&self, row: ArrayView1<'_, f32>) -> Vec<f32> {
        row.iter()
            .zip(self.mean.iter().zip(&self.std))
            .map(|(&x, (&m, &s))| (x - m) / s.max(MIN_STD))
            .collect()
    }
}
