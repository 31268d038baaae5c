//! Export of fitted pipelines as a portable computation graph.
//!
//! The graph is a JSON document in the spirit of an ONNX model: typed inputs
//! and outputs, named constant tensors, and a topologically ordered node list
//! (`Scaler`, `Gemm`, `Relu`, `Softmax`, `ArgMax`). Class probabilities are
//! emitted as a dense `[batch, classes]` float tensor next to an `int64`
//! label tensor; no map-style outputs are produced.

mod graph;

pub use graph::{
    DataType, GRAPH_FORMAT_VERSION, GraphMetadata, GraphModel, GraphOutputs, INPUT_NAME,
    Initializer, LABEL_OUTPUT, Node, OPSET_VERSION, Op, PROBABILITY_OUTPUT, TensorInfo,
};

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::bands::BandLayout;
use crate::config::SignalConfig;
use crate::ml::FittedPipeline;

/// Largest per-probability difference tolerated between the pipeline and its
/// exported graph.
pub const PARITY_TOLERANCE: f32 = 1e-4;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Pipeline cannot be exported: {0}")]
    InvalidPipeline(String),
    #[error("Exported graph is invalid: {0}")]
    InvalidGraph(String),
    #[error("Failed to serialize graph: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("Failed to parse graph at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("No probe rows were supplied to verify the exported graph")]
    NoProbes,
    #[error(
        "Exported graph disagrees with pipeline on probe {row}, class {class}: expected {expected}, got {actual}"
    )]
    ParityMismatch {
        row: usize,
        class: usize,
        expected: f32,
        actual: f32,
    },
}

/// Converts a [`FittedPipeline`] into a [`GraphModel`] and writes it to disk.
#[derive(Debug, Clone)]
pub struct ModelExporter {
    bands: BandLayout,
    signal: SignalConfig,
    test_accuracy: Option<f32>,
}

impl ModelExporter {
    pub fn new(bands: BandLayout, signal: SignalConfig) -> Self {
        Self {
            bands,
            signal,
            test_accuracy: None,
        }
    }

    /// Record the held-out accuracy in the graph metadata.
    pub fn with_test_accuracy(mut self, accuracy: f32) -> Self {
        self.test_accuracy = Some(accuracy);
        self
    }

    pub fn build_graph(&self, pipeline: &FittedPipeline) -> Result<GraphModel, ExportError> {
        pipeline.mlp.validate().map_err(ExportError::InvalidPipeline)?;
        let features = pipeline.feature_len();
        if pipeline.mlp.input_len() != features {
            return Err(ExportError::InvalidPipeline(format!(
                "scaler has {features} features, classifier expects {}",
                pipeline.mlp.input_len()
            )));
        }
        if features != self.bands.len() {
            return Err(ExportError::InvalidPipeline(format!(
                "pipeline takes {features} features but the band layout has {}",
                self.bands.len()
            )));
        }
        let classes = pipeline.classes().to_vec();

        let mut initializers = vec![
            Initializer {
                name: "scaler_offset".to_string(),
                dims: vec![features],
                values: pipeline.scaler.mean.clone(),
            },
            Initializer {
                name: "scaler_scale".to_string(),
                dims: vec![features],
                values: pipeline.scaler.inverse_scale(),
            },
        ];
        let mut nodes = vec![Node {
            name: "scaler".to_string(),
            op: Op::Scaler,
            inputs: vec![
                INPUT_NAME.to_string(),
                "scaler_offset".to_string(),
                "scaler_scale".to_string(),
            ],
            outputs: vec!["scaled".to_string()],
        }];

        let mut current = "scaled".to_string();
        let last = pipeline.mlp.layers.len() - 1;
        for (idx, layer) in pipeline.mlp.layers.iter().enumerate() {
            let weight = format!("dense{idx}_weight");
            let bias = format!("dense{idx}_bias");
            initializers.push(Initializer {
                name: weight.clone(),
                dims: vec![layer.outputs, layer.inputs],
                values: layer.weights.clone(),
            });
            initializers.push(Initializer {
                name: bias.clone(),
                dims: vec![layer.outputs],
                values: layer.bias.clone(),
            });
            let gemm_out = if idx == last {
                "logits".to_string()
            } else {
                format!("dense{idx}_out")
            };
            nodes.push(Node {
                name: format!("dense{idx}"),
                op: Op::Gemm { trans_b: true },
                inputs: vec![current, weight, bias],
                outputs: vec![gemm_out.clone()],
            });
            current = gemm_out;
            if idx != last {
                let relu_out = format!("relu{idx}_out");
                nodes.push(Node {
                    name: format!("relu{idx}"),
                    op: Op::Relu,
                    inputs: vec![current],
                    outputs: vec![relu_out.clone()],
                });
                current = relu_out;
            }
        }
        nodes.push(Node {
            name: "softmax".to_string(),
            op: Op::Softmax { axis: 1 },
            inputs: vec![current],
            outputs: vec![PROBABILITY_OUTPUT.to_string()],
        });
        nodes.push(Node {
            name: "argmax".to_string(),
            op: Op::ArgMax {
                axis: 1,
                keepdims: false,
            },
            inputs: vec![PROBABILITY_OUTPUT.to_string()],
            outputs: vec![LABEL_OUTPUT.to_string()],
        });

        let graph = GraphModel {
            format_version: GRAPH_FORMAT_VERSION,
            opset: OPSET_VERSION,
            producer: format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
            metadata: GraphMetadata {
                bands: self.bands.bands().to_vec(),
                sample_rate_hz: self.signal.sample_rate_hz,
                signal_len: self.signal.len(),
                classes: classes.clone(),
                test_accuracy: self.test_accuracy,
            },
            inputs: vec![TensorInfo {
                name: INPUT_NAME.to_string(),
                dtype: DataType::Float32,
                shape: vec![-1, features as i64],
            }],
            outputs: vec![
                TensorInfo {
                    name: LABEL_OUTPUT.to_string(),
                    dtype: DataType::Int64,
                    shape: vec![-1],
                },
                TensorInfo {
                    name: PROBABILITY_OUTPUT.to_string(),
                    dtype: DataType::Float32,
                    shape: vec![-1, classes.len() as i64],
                },
            ],
            initializers,
            nodes,
        };
        graph.validate().map_err(ExportError::InvalidGraph)?;
        Ok(graph)
    }

    /// Check the serialized graph reproduces the pipeline's probabilities on
    /// `probes`, then write it to `path`.
    ///
    /// Nothing is written when the check fails.
    pub fn export(
        &self,
        pipeline: &FittedPipeline,
        path: &Path,
        probes: &[Vec<f32>],
    ) -> Result<GraphModel, ExportError> {
        let graph = self.build_graph(pipeline)?;
        let json = serde_json::to_string_pretty(&graph).map_err(ExportError::Serialize)?;
        let reloaded: GraphModel = serde_json::from_str(&json).map_err(ExportError::Serialize)?;
        reloaded.validate().map_err(ExportError::InvalidGraph)?;
        verify_parity(pipeline, &reloaded, probes)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| ExportError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(path, json).map_err(|source| ExportError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        info!(
            "Wrote {} ({} nodes, verified on {} probes)",
            path.display(),
            reloaded.nodes.len(),
            probes.len()
        );
        Ok(reloaded)
    }
}

/// Read and validate a graph previously written by [`ModelExporter::export`].
pub fn load_graph(path: &Path) -> Result<GraphModel, ExportError> {
    let text = std::fs::read_to_string(path).map_err(|source| ExportError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let graph: GraphModel = serde_json::from_str(&text).map_err(|source| ExportError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    graph.validate().map_err(ExportError::InvalidGraph)?;
    Ok(graph)
}

fn verify_parity(
    pipeline: &FittedPipeline,
    graph: &GraphModel,
    probes: &[Vec<f32>],
) -> Result<(), ExportError> {
    if probes.is_empty() {
        return Err(ExportError::NoProbes);
    }
    let outputs = graph.run(probes).map_err(ExportError::InvalidGraph)?;
    for (row, (probe, actual)) in probes.iter().zip(&outputs.probabilities).enumerate() {
        let expected = pipeline.predict_proba(probe);
        if expected.len() != actual.len() {
            return Err(ExportError::InvalidGraph(format!(
                "probe {row} produced {} probabilities, expected {}",
                actual.len(),
                expected.len()
            )));
        }
        for (class, (&e, &a)) in expected.iter().zip(actual).enumerate() {
            if (e - a).abs() > PARITY_TOLERANCE {
                return Err(ExportError::ParityMismatch {
                    row,
                    class,
                    expected: e,
                    actual: a,
                });
            }
        }
    }
    Ok(())
}
