use rand::rngs::StdRng;
use rand::{Rng, SeedableRng, seq::SliceRandom};
use tracing::debug;

use super::model::{DenseLayer, MlpModel, softmax};
use crate::ml::TrainError;

#[derive(Debug, Clone)]
pub struct TrainOptions {
    pub hidden_layers: Vec<usize>,
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f32,
    pub momentum: f32,
    pub l2_penalty: f32,
    pub seed: u64,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            hidden_layers: vec![32, 16],
            epochs: 200,
            batch_size: 64,
            learning_rate: 0.01,
            momentum: 0.9,
            l2_penalty: 1e-4,
            seed: 0,
        }
    }
}

/// Fit an MLP with mini-batch SGD + momentum on standardized rows.
pub fn train_mlp(
    x: &[Vec<f32>],
    y: &[usize],
    classes: &[String],
    options: &TrainOptions,
) -> Result<MlpModel, TrainError> {
    if x.len() != y.len() {
        return Err(TrainError::Shape(format!(
            "{} rows but {} labels",
            x.len(),
            y.len()
        )));
    }
    if x.is_empty() {
        return Err(TrainError::Empty);
    }
    if classes.len() < 2 {
        return Err(TrainError::TooFewClasses(classes.len()));
    }
    if options.epochs == 0 {
        return Err(TrainError::ZeroEpochs);
    }
    let d = x[0].len();
    if let Some(row) = x.iter().find(|row| row.len() != d) {
        return Err(TrainError::FeatureLenMismatch {
            expected: d,
            actual: row.len(),
        });
    }
    if let Some(&label) = y.iter().find(|&&label| label >= classes.len()) {
        return Err(TrainError::LabelOutOfRange {
            label,
            classes: classes.len(),
        });
    }

    let mut rng = StdRng::seed_from_u64(options.seed);
    let mut layers = init_layers(d, &options.hidden_layers, classes.len(), &mut rng);
    let mut velocity: Vec<DenseLayer> = layers
        .iter()
        .map(|layer| DenseLayer::zeros(layer.inputs, layer.outputs))
        .collect();
    let mut grads = velocity.clone();
    let batch_size = options.batch_size.max(1);
    let momentum = options.momentum.clamp(0.0, 0.99);
    let mut indices: Vec<usize> = (0..x.len()).collect();
    let mut trace = Trace::new(layers.len());

    for epoch in 0..options.epochs {
        indices.shuffle(&mut rng);
        let mut epoch_loss = 0.0f64;
        for batch in indices.chunks(batch_size) {
            for grad in grads.iter_mut() {
                grad.weights.fill(0.0);
                grad.bias.fill(0.0);
            }
            for &idx in batch {
                epoch_loss += trace.accumulate(&layers, &x[idx], y[idx], &mut grads) as f64;
            }

            let scale = 1.0 / batch.len() as f32;
            for ((layer, vel), grad) in layers.iter_mut().zip(velocity.iter_mut()).zip(&grads) {
                for i in 0..layer.weights.len() {
                    let g = grad.weights[i] * scale + options.l2_penalty * layer.weights[i];
                    vel.weights[i] = momentum * vel.weights[i] - options.learning_rate * g;
                    layer.weights[i] += vel.weights[i];
                }
                for i in 0..layer.bias.len() {
                    let g = grad.bias[i] * scale;
                    vel.bias[i] = momentum * vel.bias[i] - options.learning_rate * g;
                    layer.bias[i] += vel.bias[i];
                }
            }
        }
        if (epoch + 1) % 50 == 0 || epoch + 1 == options.epochs {
            debug!(
                "epoch {}/{} mean loss {:.4}",
                epoch + 1,
                options.epochs,
                epoch_loss / x.len() as f64
            );
        }
    }

    Ok(MlpModel {
        classes: classes.to_vec(),
        layers,
    })
}

/// Glorot-uniform weights, zero biases.
fn init_layers(
    inputs: usize,
    hidden: &[usize],
    outputs: usize,
    rng: &mut StdRng,
) -> Vec<DenseLayer> {
    let mut widths = Vec::with_capacity(hidden.len() + 2);
    widths.push(inputs);
    widths.extend(hidden.iter().map(|&h| h.max(1)));
    widths.push(outputs);
    widths
        .windows(2)
        .map(|pair| {
            let mut layer = DenseLayer::zeros(pair[0], pair[1]);
            let limit = (6.0 / (pair[0] + pair[1]) as f32).sqrt();
            for w in &mut layer.weights {
                *w = (rng.random::<f32>() * 2.0 - 1.0) * limit;
            }
            layer
        })
        .collect()
}

/// Per-sample forward/backward scratch space.
struct Trace {
    /// `activations[l]` is the input to layer `l`.
    activations: Vec<Vec<f32>>,
    pre: Vec<Vec<f32>>,
    delta: Vec<f32>,
    delta_prev: Vec<f32>,
}

impl Trace {
    fn new(layers: usize) -> Self {
        Self {
            activations: vec![Vec::new(); layers + 1],
            pre: vec![Vec::new(); layers],
            delta: Vec::new(),
            delta_prev: Vec::new(),
        }
    }

    /// Add this sample's cross-entropy gradients into `grads`; returns its loss.
    fn accumulate(
        &mut self,
        layers: &[DenseLayer],
        x: &[f32],
        y: usize,
        grads: &mut [DenseLayer],
    ) -> f32 {
        let last = layers.len() - 1;
        self.activations[0].clear();
        self.activations[0].extend_from_slice(x);
        for (l, layer) in layers.iter().enumerate() {
            let (head, tail) = self.activations.split_at_mut(l + 1);
            layer.forward_into(&head[l], &mut self.pre[l]);
            let out = &mut tail[0];
            out.clear();
            if l < last {
                out.extend(self.pre[l].iter().map(|v| v.max(0.0)));
            } else {
                out.extend(softmax(&self.pre[l]));
            }
        }

        let probs = &self.activations[last + 1];
        let loss = -probs[y].max(1e-12).ln();
        self.delta.clear();
        self.delta.extend(
            probs
                .iter()
                .enumerate()
                .map(|(c, &p)| if c == y { p - 1.0 } else { p }),
        );

        for l in (0..layers.len()).rev() {
            let layer = &layers[l];
            let grad = &mut grads[l];
            let input = &self.activations[l];
            for o in 0..layer.outputs {
                let dz = self.delta[o];
                grad.bias[o] += dz;
                let base = o * layer.inputs;
                for i in 0..layer.inputs {
                    grad.weights[base + i] += dz * input[i];
                }
            }
            if l == 0 {
                break;
            }
            self.delta_prev.clear();
            self.delta_prev.resize(layer.inputs, 0.0);
            for o in 0..layer.outputs {
                let dz = self.delta[o];
                let base = o * layer.inputs;
                for i in 0..layer.inputs {
                    self.delta_prev[i] += dz * layer.weights[base + i];
                }
            }
            for (i, d) in self.delta_prev.iter_mut().enumerate() {
                if self.pre[l - 1][i] <= 0.0 {
                    *d = 0.0;
                }
            }
            std::mem::swap(&mut self.delta, &mut self.delta_prev);
        }
        loss
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blobs(n_per_class: usize, seed: u64) -> (Vec<Vec<f32>>, Vec<usize>) {
        let mut rng = StdRng::seed_from_u64(seed);
        let centers = [[-2.0f32, 0.0], [2.0, 0.0], [0.0, 2.5]];
        let mut x = Vec::new();
        let mut y = Vec::new();
        for _ in 0..n_per_class {
            for (class, center) in centers.iter().enumerate() {
                x.push(vec![
                    center[0] + rng.random::<f32>() - 0.5,
                    center[1] + rng.random::<f32>() - 0.5,
                ]);
                y.push(class);
            }
        }
        (x, y)
    }

    fn classes() -> Vec<String> {
        vec!["a".into(), "b".into(), "c".into()]
    }

    #[test]
    fn learns_separable_blobs() {
        let (x, y) = blobs(40, 1);
        let options = TrainOptions {
            hidden_layers: vec![8],
            epochs: 60,
            batch_size: 16,
            ..TrainOptions::default()
        };
        let model = train_mlp(&x, &y, &classes(), &options).unwrap();
        model.validate().unwrap();
        let correct = x
            .iter()
            .zip(&y)
            .filter(|(row, label)| model.predict_class_index(row) == **label)
            .count();
        assert!(correct as f32 / x.len() as f32 > 0.95, "{correct}/{}", x.len());
    }

    #[test]
    fn builds_requested_layer_stack() {
        let (x, y) = blobs(5, 2);
        let options = TrainOptions {
            epochs: 1,
            ..TrainOptions::default()
        };
        let model = train_mlp(&x, &y, &classes(), &options).unwrap();
        let widths: Vec<(usize, usize)> = model
            .layers
            .iter()
            .map(|layer| (layer.inputs, layer.outputs))
            .collect();
        assert_eq!(widths, vec![(2, 32), (32, 16), (16, 3)]);
    }

    #[test]
    fn same_seed_trains_identical_models() {
        let (x, y) = blobs(10, 3);
        let options = TrainOptions {
            epochs: 5,
            ..TrainOptions::default()
        };
        let a = train_mlp(&x, &y, &classes(), &options).unwrap();
        let b = train_mlp(&x, &y, &classes(), &options).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn rejects_invalid_inputs() {
        let options = TrainOptions::default();
        assert!(matches!(
            train_mlp(&[], &[], &classes(), &options),
            Err(TrainError::Empty)
        ));
        assert!(matches!(
            train_mlp(&[vec![0.0]], &[0], &["only".to_string()], &options),
            Err(TrainError::TooFewClasses(1))
        ));
        assert!(matches!(
            train_mlp(&[vec![0.0], vec![1.0]], &[0, 5], &classes(), &options),
            Err(TrainError::LabelOutOfRange { label: 5, .. })
        ));
        assert!(matches!(
            train_mlp(&[vec![0.0], vec![1.0, 2.0]], &[0, 1], &classes(), &options),
            Err(TrainError::FeatureLenMismatch { .. })
        ));
        let zero = TrainOptions {
            epochs: 0,
            ..TrainOptions::default()
        };
        assert!(matches!(
            train_mlp(&[vec![0.0]], &[0], &classes(), &zero),
            Err(TrainError::ZeroEpochs)
        ));
    }
}
