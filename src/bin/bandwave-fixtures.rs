//! Writes the raw signal fixtures and reports their band-power features.

use std::path::PathBuf;

use bandwave::analysis::BandPowerExtractor;
use bandwave::config::PipelineConfig;
use bandwave::fixtures::{FixtureWriter, default_presets, read_signal_csv};
use bandwave::synth::SignalSynthesizer;
use tracing::info;

fn main() {
    if let Err(err) = bandwave::logging::init("bandwave-fixtures") {
        eprintln!("Logging disabled: {err}");
    }
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let options = parse_args(std::env::args().skip(1).collect())?;
    let mut config =
        PipelineConfig::load(options.config.as_deref()).map_err(|err| err.to_string())?;
    if let Some(seed) = options.seed {
        config.fixtures.seed = seed;
    }
    let out_dir = options
        .out_dir
        .unwrap_or_else(|| config.fixtures.out_dir.clone());

    let synth = SignalSynthesizer::new(config.signal, config.bands.clone(), config.synthesis)
        .map_err(|err| err.to_string())?;
    let extractor = BandPowerExtractor::new(config.signal, config.bands.clone());
    let writer = FixtureWriter::new(&synth, config.fixtures.clone());
    let written = writer
        .write_all(&default_presets(), &out_dir)
        .map_err(|err| err.to_string())?;

    let names = config.bands.names();
    for path in &written {
        let signal = read_signal_csv(path).map_err(|err| err.to_string())?;
        let features = extractor.extract(&signal).map_err(|err| err.to_string())?;
        let dominant = features
            .dominant_band()
            .and_then(|idx| names.get(idx))
            .map(String::as_str)
            .unwrap_or("-");
        info!(
            "{}: features={:?} dominant={} ratio={:.2}",
            path.display(),
            features.as_slice(),
            dominant,
            features.dominance_ratio()
        );
        println!("{}", path.display());
    }
    Ok(())
}

#[derive(Debug, Clone, Default)]
struct CliOptions {
    config: Option<PathBuf>,
    out_dir: Option<PathBuf>,
    seed: Option<u64>,
}

fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut options = CliOptions::default();
    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => return Err(help_text()),
            "--config" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--config requires a value".to_string())?;
                options.config = Some(PathBuf::from(value));
            }
            "--out-dir" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--out-dir requires a value".to_string())?;
                options.out_dir = Some(PathBuf::from(value));
            }
            "--seed" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--seed requires a value".to_string())?;
                options.seed = Some(
                    value
                        .parse::<u64>()
                        .map_err(|_| format!("Invalid --seed value: {value}"))?,
                );
            }
            unknown => return Err(format!("Unknown argument: {unknown}\n\n{}", help_text())),
        }
        idx += 1;
    }
    Ok(options)
}

fn help_text() -> String {
    [
        "bandwave-fixtures",
        "",
        "Writes single-column raw signal fixtures for smoke tests.",
        "",
        "Usage:",
        "  bandwave-fixtures [--config bandwave.toml] [--out-dir data/tests] [--seed 0]",
    ]
    .join("\n")
}
