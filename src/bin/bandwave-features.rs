//! Prints the band-power feature vector of a single-column signal file.

use std::path::PathBuf;

use bandwave::analysis::BandPowerExtractor;
use bandwave::config::PipelineConfig;
use bandwave::fixtures::read_signal_csv;
use tracing::warn;

/// Below this top/second ratio the signal has no clear dominant rhythm.
const MIN_DOMINANCE_RATIO: f32 = 1.5;

fn main() {
    if let Err(err) = bandwave::logging::init("bandwave-features") {
        eprintln!("Logging disabled: {err}");
    }
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let (csv, config_path) = parse_args(std::env::args().skip(1).collect())?;
    let config = PipelineConfig::load(config_path.as_deref()).map_err(|err| err.to_string())?;
    let extractor = BandPowerExtractor::new(config.signal, config.bands.clone());
    let signal = read_signal_csv(&csv).map_err(|err| err.to_string())?;
    let features = extractor.extract(&signal).map_err(|err| err.to_string())?;

    for (band, value) in config.bands.bands().iter().zip(features.as_slice()) {
        println!(
            "{:<6} [{:>5.1}, {:>5.1}) Hz  {:.6}",
            band.name, band.lo_hz, band.hi_hz, value
        );
    }
    let ratio = features.dominance_ratio();
    println!("dominance ratio: {ratio:.3}");
    if ratio < MIN_DOMINANCE_RATIO {
        warn!(
            "{} has no clearly dominant band (ratio {ratio:.3} < {MIN_DOMINANCE_RATIO})",
            csv.display()
        );
    }
    Ok(())
}

fn parse_args(args: Vec<String>) -> Result<(PathBuf, Option<PathBuf>), String> {
    let mut csv = None;
    let mut config = None;
    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => return Err(help_text()),
            "--csv" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--csv requires a value".to_string())?;
                csv = Some(PathBuf::from(value));
            }
            "--config" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--config requires a value".to_string())?;
                config = Some(PathBuf::from(value));
            }
            unknown => return Err(format!("Unknown argument: {unknown}\n\n{}", help_text())),
        }
        idx += 1;
    }
    let csv = csv.ok_or_else(help_text)?;
    Ok((csv, config))
}

fn help_text() -> String {
    [
        "bandwave-features",
        "",
        "Prints relative band powers for a single-column signal file.",
        "",
        "Usage:",
        "  bandwave-features --csv <file> [--config bandwave.toml]",
    ]
    .join("\n")
}
