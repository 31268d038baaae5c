//! Band-power rhythm classification: synthetic signal generation, spectral
//! feature extraction, classifier training and portable model export.
/// Application directory helpers.
pub mod app_dirs;
/// Frequency band definitions.
pub mod bands;
/// TOML-backed pipeline configuration.
pub mod config;
/// Spectral band-power features.
pub mod analysis;
/// Labeled datasets and train/test splitting.
pub mod dataset;
/// Computation-graph export of fitted pipelines.
pub mod export;
/// Raw signal fixture files.
pub mod fixtures;
/// Logging setup shared by the binaries.
pub mod logging;
/// Scaler + MLP training and evaluation.
pub mod ml;
/// Synthetic signal generation.
pub mod synth;
/// End-to-end training workflow.
pub mod training;
