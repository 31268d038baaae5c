//! Builds a synthetic band-power dataset, trains the classifier and exports it.

use std::path::PathBuf;

use bandwave::config::PipelineConfig;
use bandwave::training::run_training;

fn main() {
    if let Err(err) = bandwave::logging::init("bandwave-train") {
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
    if let Some(samples) = options.samples {
        config.training.samples = samples;
    }
    if let Some(epochs) = options.epochs {
        config.training.epochs = epochs;
    }
    if let Some(seed) = options.seed {
        config.training.synth_seed = seed;
    }
    if let Some(out) = options.model_out {
        config.training.model_out = out;
    }

    let report = run_training(&config, !options.no_export).map_err(|err| err.to_string())?;
    let classes = report.pipeline.classes();
    println!(
        "train samples: {}  test samples: {}",
        report.train_len, report.test_len
    );
    println!("test accuracy: {:.4}", report.evaluation.accuracy);
    for (idx, stats) in report.evaluation.per_class.iter().enumerate() {
        println!(
            "class {:>2} {:<8}  precision={:.3}  recall={:.3}  f1={:.3}  support={}",
            idx, classes[idx], stats.precision, stats.recall, stats.f1, stats.support
        );
    }
    let cm = &report.evaluation.confusion;
    println!("confusion matrix (rows=true, cols=pred):");
    for truth in 0..cm.n_classes {
        let mut row = String::new();
        for pred in 0..cm.n_classes {
            row.push_str(&format!("{:6}", cm.get(truth, pred)));
        }
        println!("{row}");
    }
    if let Some(path) = &report.model_path {
        println!("model written to {}", path.display());
    }
    Ok(())
}

#[derive(Debug, Clone, Default)]
struct CliOptions {
    config: Option<PathBuf>,
    samples: Option<usize>,
    epochs: Option<usize>,
    seed: Option<u64>,
    model_out: Option<PathBuf>,
    no_export: bool,
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
            "--samples" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--samples requires a value".to_string())?;
                options.samples = Some(
                    value
                        .parse::<usize>()
                        .map_err(|_| format!("Invalid --samples value: {value}"))?,
                );
            }
            "--epochs" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--epochs requires a value".to_string())?;
                options.epochs = Some(
                    value
                        .parse::<usize>()
                        .map_err(|_| format!("Invalid --epochs value: {value}"))?,
                );
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
            "--out" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--out requires a value".to_string())?;
                options.model_out = Some(PathBuf::from(value));
            }
            "--no-export" => options.no_export = true,
            unknown => return Err(format!("Unknown argument: {unknown}\n\n{}", help_text())),
        }
        idx += 1;
    }
    Ok(options)
}

fn help_text() -> String {
    [
        "bandwave-train",
        "",
        "Synthesizes labeled signals, trains the band classifier and exports it.",
        "",
        "Usage:",
        "  bandwave-train [--config bandwave.toml] [--out model/band_mlp.json]",
        "",
        "Options:",
        "  --config <file>   TOML configuration (defaults when omitted)",
        "  --samples <n>     Number of synthesized samples (default 5000)",
        "  --epochs <n>      Training epochs (default 200)",
        "  --seed <n>        Synthesis RNG seed (default 1)",
        "  --out <file>      Exported graph path (default model/band_mlp.json)",
        "  --no-export       Train and evaluate without writing the model",
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_overrides() {
        let options = parse_args(
            ["--samples", "250", "--epochs", "10", "--out", "m.json", "--no-export"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        )
        .unwrap();
        assert_eq!(options.samples, Some(250));
        assert_eq!(options.epochs, Some(10));
        assert_eq!(options.model_out, Some(PathBuf::from("m.json")));
        assert!(options.no_export);
    }

    #[test]
    fn rejects_unknown_flags() {
        let err = parse_args(vec!["--bogus".to_string()]).unwrap_err();
        assert!(err.starts_with("Unknown argument: --bogus"));
    }
}
