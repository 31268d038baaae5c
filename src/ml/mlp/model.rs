use serde::{Deserialize, Serialize};

/// Fully-connected layer; `weights` is row-major `[outputs][inputs]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseLayer {
    pub inputs: usize,
    pub outputs: usize,
    pub weights: Vec<f32>,
    pub bias: Vec<f32>,
}

impl DenseLayer {
    pub(super) fn zeros(inputs: usize, outputs: usize) -> Self {
        Self {
            inputs,
            outputs,
            weights: vec![0.0; inputs * outputs],
            bias: vec![0.0; outputs],
        }
    }

    /// Affine map `W x + b` into `out`.
    pub(super) fn forward_into(&self, input: &[f32], out: &mut Vec<f32>) {
        out.clear();
        for o in 0..self.outputs {
            let base = o * self.inputs;
            let mut sum = self.bias[o];
            for i in 0..self.inputs {
                sum += self.weights[base + i] * input[i];
            }
            out.push(sum);
        }
    }
}

/// Multi-layer perceptron: ReLU hidden layers, softmax output.
///
/// Inputs are expected to be standardized already.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MlpModel {
    pub classes: Vec<String>,
    pub layers: Vec<DenseLayer>,
}

impl MlpModel {
    pub fn validate(&self) -> Result<(), String> {
        let Some(first) = self.layers.first() else {
            return Err("Model has no layers".to_string());
        };
        if first.inputs == 0 {
            return Err("Input layer has zero width".to_string());
        }
        let mut width = first.inputs;
        for (idx, layer) in self.layers.iter().enumerate() {
            if layer.inputs != width {
                return Err(format!(
                    "Layer {idx} expects {} inputs, previous layer emits {width}",
                    layer.inputs
                ));
            }
            if layer.weights.len() != layer.inputs * layer.outputs {
                return Err(format!("Layer {idx} weights length mismatch"));
            }
            if layer.bias.len() != layer.outputs {
                return Err(format!("Layer {idx} bias length mismatch"));
            }
            width = layer.outputs;
        }
        if width != self.classes.len() {
            return Err(format!(
                "Output width {width} does not match {} classes",
                self.classes.len()
            ));
        }
        Ok(())
    }

    pub fn input_len(&self) -> usize {
        self.layers.first().map(|layer| layer.inputs).unwrap_or(0)
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    /// Pre-softmax scores; empty when `features` has the wrong length.
    pub fn logits(&self, features: &[f32]) -> Vec<f32> {
        if features.len() != self.input_len() {
            return Vec::new();
        }
        let mut current = features.to_vec();
        let mut next = Vec::new();
        let last = self.layers.len().saturating_sub(1);
        for (idx, layer) in self.layers.iter().enumerate() {
            layer.forward_into(&current, &mut next);
            if idx < last {
                for v in next.iter_mut() {
                    *v = v.max(0.0);
                }
            }
            std::mem::swap(&mut current, &mut next);
        }
        current
    }

    pub fn predict_proba(&self, features: &[f32]) -> Vec<f32> {
        softmax(&self.logits(features))
    }

    pub fn predict_class_index(&self, features: &[f32]) -> usize {
        argmax(&self.predict_proba(features))
    }
}

pub fn softmax(raw: &[f32]) -> Vec<f32> {
    if raw.is_empty() {
        return Vec::new();
    }
    let max = raw
        .iter()
        .copied()
        .fold(f32::NEG_INFINITY, |a, b| a.max(b));
    let mut exps = Vec::with_capacity(raw.len());
    let mut sum = 0.0f32;
    for &v in raw {
        let e = (v - max).exp();
        exps.push(e);
        sum += e;
    }
    if sum == 0.0 {
        return vec![1.0 / raw.len() as f32; raw.len()];
    }
    for v in &mut exps {
        *v /= sum;
    }
    exps
}

pub(crate) fn argmax(values: &[f32]) -> usize {
    let mut best_idx = 0usize;
    let mut best_val = f32::NEG_INFINITY;
    for (idx, &v) in values.iter().enumerate() {
        if v > best_val {
            best_val = v;
            best_idx = idx;
        }
    }
    best_idx
}
