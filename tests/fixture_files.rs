use bandwave::analysis::BandPowerExtractor;
use bandwave::config::PipelineConfig;
use bandwave::fixtures::{FixtureWriter, default_presets, read_signal_csv};
use bandwave::synth::SignalSynthesizer;
use tempfile::tempdir;

#[test]
fn fixtures_round_trip_through_the_extractor() {
    let config = PipelineConfig::default();
    let dir = tempdir().unwrap();
    let synth =
        SignalSynthesizer::new(config.signal, config.bands.clone(), config.synthesis).unwrap();
    let extractor = BandPowerExtractor::new(config.signal, config.bands.clone());
    let written = FixtureWriter::new(&synth, config.fixtures.clone())
        .write_all(&default_presets(), dir.path())
        .unwrap();

    let names: Vec<String> = written
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        names,
        vec![
            "delta_dominant.csv",
            "theta_dominant.csv",
            "alpha_dominant.csv",
            "beta_dominant.csv",
            "gamma_dominant.csv",
            "mixed_alpha_beta.csv",
            "noisy.csv",
        ]
    );

    let text = std::fs::read_to_string(&written[0]).unwrap();
    let first = text.lines().next().unwrap();
    assert!(first.contains('e') && !first.contains(','));
    assert_eq!(first.split('e').next().unwrap().split('.').nth(1).unwrap().len(), 18);

    let mixed = extractor
        .extract(&read_signal_csv(&written[5]).unwrap())
        .unwrap();
    let values = mixed.as_slice();
    assert!(values[2] > 0.3 && values[3] > 0.3, "{values:?}");
    assert!(mixed.dominance_ratio() < 1.5);

    let alpha = extractor
        .extract(&read_signal_csv(&written[2]).unwrap())
        .unwrap();
    assert!(alpha.dominance_ratio() > 1.5);
}
