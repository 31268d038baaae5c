//! Small multi-layer perceptron classifier for band-power features.

mod model;
mod train;

pub use model::{DenseLayer, MlpModel, softmax};
pub use train::{TrainOptions, train_mlp};

pub(crate) use model::argmax;
