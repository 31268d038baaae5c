use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::bands::Band;

pub const GRAPH_FORMAT_VERSION: u32 = 1;
pub const OPSET_VERSION: u32 = 17;
pub const INPUT_NAME: &str = "input";
pub const LABEL_OUTPUT: &str = "label";
pub const PROBABILITY_OUTPUT: &str = "probabilities";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Float32,
    Int64,
}

/// Graph input/output signature; `-1` marks the dynamic batch axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TensorInfo {
    pub name: String,
    pub dtype: DataType,
    pub shape: Vec<i64>,
}

/// Constant `float32` tensor stored row-major.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Initializer {
    pub name: String,
    pub dims: Vec<usize>,
    pub values: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op_type")]
pub enum Op {
    /// `(x - offset) * scale`; inputs `[x, offset, scale]`.
    Scaler,
    /// `x · Wᵀ + b` when `trans_b`; inputs `[x, W, b]`.
    Gemm { trans_b: bool },
    Relu,
    Softmax { axis: i64 },
    ArgMax { axis: i64, keepdims: bool },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    pub op: Op,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
}

/// Information a consumer needs to reproduce the feature extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphMetadata {
    pub bands: Vec<Band>,
    pub sample_rate_hz: u32,
    pub signal_len: usize,
    pub classes: Vec<String>,
    #[serde(default)]
    pub test_accuracy: Option<f32>,
}

/// Portable scaler + classifier computation graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphModel {
    pub format_version: u32,
    pub opset: u32,
    pub producer: String,
    pub metadata: GraphMetadata,
    pub inputs: Vec<TensorInfo>,
    pub outputs: Vec<TensorInfo>,
    pub initializers: Vec<Initializer>,
    pub nodes: Vec<Node>,
}

/// Results of one evaluation of the graph.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphOutputs {
    pub labels: Vec<i64>,
    /// One row of class probabilities per input row.
    pub probabilities: Vec<Vec<f32>>,
}

#[derive(Debug, Clone)]
enum Value {
    Float { rows: usize, cols: usize, data: Vec<f32> },
    Int(Vec<i64>),
}

impl GraphModel {
    /// Structural checks: versions, signatures, and that every node input is
    /// defined before use.
    pub fn validate(&self) -> Result<(), String> {
        if self.format_version != GRAPH_FORMAT_VERSION {
            return Err(format!(
                "Unsupported format_version {} (expected {GRAPH_FORMAT_VERSION})",
                self.format_version
            ));
        }
        let [input] = self.inputs.as_slice() else {
            return Err("Graph must declare exactly one input".to_string());
        };
        if input.dtype != DataType::Float32 || input.shape.len() != 2 {
            return Err("Graph input must be a rank-2 float32 tensor".to_string());
        }
        let probs = self
            .outputs
            .iter()
            .find(|output| output.name == PROBABILITY_OUTPUT)
            .ok_or_else(|| format!("Graph has no {PROBABILITY_OUTPUT} output"))?;
        if probs.dtype != DataType::Float32
            || probs.shape != vec![-1, self.metadata.classes.len() as i64]
        {
            return Err("Probability output must be a dense [batch, classes] tensor".to_string());
        }

        let mut defined: Vec<&str> = vec![input.name.as_str()];
        for init in &self.initializers {
            if init.dims.iter().product::<usize>() != init.values.len() {
                return Err(format!("Initializer {} dims do not match values", init.name));
            }
            defined.push(init.name.as_str());
        }
        for node in &self.nodes {
            let expected_inputs = match node.op {
                Op::Scaler | Op::Gemm { .. } => 3,
                Op::Relu | Op::Softmax { .. } | Op::ArgMax { .. } => 1,
            };
            if node.inputs.len() != expected_inputs || node.outputs.len() != 1 {
                return Err(format!("Node {} has the wrong arity", node.name));
            }
            if let Some(missing) = node.inputs.iter().find(|name| !defined.contains(&name.as_str()))
            {
                return Err(format!("Node {} reads undefined tensor {missing}", node.name));
            }
            defined.extend(node.outputs.iter().map(String::as_str));
        }
        if let Some(missing) = self
            .outputs
            .iter()
            .find(|output| !defined.contains(&output.name.as_str()))
        {
            return Err(format!("Output {} is never produced", missing.name));
        }
        Ok(())
    }

    /// Reference evaluator used to verify exported graphs.
    pub fn run(&self, batch: &[Vec<f32>]) -> Result<GraphOutputs, String> {
        self.validate()?;
        let input = self
            .inputs
            .first()
            .ok_or_else(|| "Graph has no input".to_string())?;
        let cols = input.shape.get(1).copied().unwrap_or(-1);
        if let Some(row) = batch.iter().find(|row| row.len() as i64 != cols) {
            return Err(format!("Input row has {} values, graph expects {cols}", row.len()));
        }

        let mut values: HashMap<&str, Value> = HashMap::new();
        values.insert(
            input.name.as_str(),
            Value::Float {
                rows: batch.len(),
                cols: cols.max(0) as usize,
                data: batch.iter().flatten().copied().collect(),
            },
        );
        let constants: HashMap<&str, &Initializer> = self
            .initializers
            .iter()
            .map(|init| (init.name.as_str(), init))
            .collect();

        for node in &self.nodes {
            let x = float_input(&values, &node.inputs[0])?;
            let out = match &node.op {
                Op::Scaler => {
                    let offset = constant(&constants, &node.inputs[1])?;
                    let scale = constant(&constants, &node.inputs[2])?;
                    scaler(x, &offset.values, &scale.values)?
                }
                Op::Gemm { trans_b } => {
                    let w = constant(&constants, &node.inputs[1])?;
                    let b = constant(&constants, &node.inputs[2])?;
                    gemm(x, w, &b.values, *trans_b)?
                }
                Op::Relu => map_float(x, |v| v.max(0.0)),
                Op::Softmax { .. } => softmax_rows(x),
                Op::ArgMax { .. } => argmax_rows(x),
            };
            values.insert(node.outputs[0].as_str(), out);
        }

        let probabilities = match values.get(PROBABILITY_OUTPUT) {
            Some(Value::Float { cols, data, .. }) => {
                data.chunks((*cols).max(1)).map(|row| row.to_vec()).collect()
            }
            _ => return Err(format!("{PROBABILITY_OUTPUT} was not computed as float")),
        };
        let labels = match values.get(LABEL_OUTPUT) {
            Some(Value::Int(labels)) => labels.clone(),
            _ => return Err(format!("{LABEL_OUTPUT} was not computed as int64")),
        };
        Ok(GraphOutputs {
            labels,
            probabilities,
        })
    }
}

fn float_input<'a>(
    values: &'a HashMap<&str, Value>,
    name: &str,
) -> Result<(usize, usize, &'a [f32]), String> {
    match values.get(name) {
        Some(Value::Float { rows, cols, data }) => Ok((*rows, *cols, data.as_slice())),
        Some(Value::Int(_)) => Err(format!("Tensor {name} is not float")),
        None => Err(format!("Tensor {name} is not available")),
    }
}

fn constant<'a>(
    constants: &HashMap<&str, &'a Initializer>,
    name: &str,
) -> Result<&'a Initializer, String> {
    constants
        .get(name)
        .copied()
        .ok_or_else(|| format!("Initializer {name} is missing"))
}

fn scaler(
    (rows, cols, data): (usize, usize, &[f32]),
    offset: &[f32],
    scale: &[f32],
) -> Result<Value, String> {
    if offset.len() != cols || scale.len() != cols {
        return Err("Scaler parameters do not match input width".to_string());
    }
    let data = data
        .chunks(cols.max(1))
        .flat_map(|row| {
            row.iter()
                .zip(offset.iter().zip(scale))
                .map(|(&x, (&o, &s))| (x - o) * s)
        })
        .collect();
    Ok(Value::Float { rows, cols, data })
}

fn gemm(
    (rows, cols, data): (usize, usize, &[f32]),
    w: &Initializer,
    bias: &[f32],
    trans_b: bool,
) -> Result<Value, String> {
    let [d0, d1] = w.dims.as_slice() else {
        return Err(format!("Gemm weight {} must be rank 2", w.name));
    };
    let (inner, outputs) = if trans_b { (*d1, *d0) } else { (*d0, *d1) };
    if inner != cols || bias.len() != outputs {
        return Err(format!("Gemm weight {} does not fit input width {cols}", w.name));
    }
    let mut out = Vec::with_capacity(rows * outputs);
    for row in data.chunks(cols.max(1)).take(rows) {
        for o in 0..outputs {
            let mut sum = bias[o];
            for i in 0..inner {
                let weight = if trans_b {
                    w.values[o * inner + i]
                } else {
                    w.values[i * outputs + o]
                };
                sum += weight * row[i];
            }
            out.push(sum);
        }
    }
    Ok(Value::Float {
        rows,
        cols: outputs,
        data: out,
    })
}

fn map_float((rows, cols, data): (usize, usize, &[f32]), f: impl Fn(f32) -> f32) -> Value {
    Value::Float {
        rows,
        cols,
        data: data.iter().map(|&v| f(v)).collect(),
    }
}

fn softmax_rows((rows, cols, data): (usize, usize, &[f32])) -> Value {
    let data = data
        .chunks(cols.max(1))
        .flat_map(crate::ml::mlp::softmax)
        .collect();
    Value::Float { rows, cols, data }
}

fn argmax_rows((_, cols, data): (usize, usize, &[f32])) -> Value {
    Value::Int(
        data.chunks(cols.max(1))
            .map(|row| crate::ml::mlp::argmax(row) as i64)
            .collect(),
    )
}
