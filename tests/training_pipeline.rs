//! End-to-end checks on a reduced synthetic workload.

use bandwave::config::PipelineConfig;
use bandwave::export::{PROBABILITY_OUTPUT, load_graph};
use bandwave::training::run_training;
use tempfile::tempdir;

fn small_config(model_out: std::path::PathBuf) -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.training.samples = 400;
    config.training.epochs = 60;
    config.training.batch_size = 32;
    config.training.model_out = model_out;
    config
}

#[test]
fn trained_pipeline_beats_chance_and_exports() {
    let dir = tempdir().unwrap();
    let model_out = dir.path().join("model").join("band_mlp.json");
    let report = run_training(&small_config(model_out.clone()), true).unwrap();

    assert_eq!(report.train_len + report.test_len, 400);
    assert_eq!(report.test_len, 80);
    assert!(
        report.evaluation.accuracy > 0.7,
        "accuracy {}",
        report.evaluation.accuracy
    );
    assert_eq!(report.evaluation.confusion.total(), 80);
    assert_eq!(report.model_path.as_deref(), Some(model_out.as_path()));

    let graph = load_graph(&model_out).unwrap();
    assert_eq!(graph.metadata.classes, report.pipeline.classes());
    assert_eq!(graph.metadata.signal_len, 1024);
    assert!(graph.outputs.iter().any(|o| o.name == PROBABILITY_OUTPUT));

    let probe = vec![0.02, 0.03, 0.9, 0.03, 0.02];
    let outputs = graph.run(&[probe.clone()]).unwrap();
    let expected = report.pipeline.predict_proba(&probe);
    for (a, e) in outputs.probabilities[0].iter().zip(&expected) {
        assert!((a - e).abs() < 1e-4);
    }
    assert_eq!(outputs.labels[0] as usize, report.pipeline.predict(&probe));
}

#[test]
fn same_config_trains_the_same_model() {
    let dir = tempdir().unwrap();
    let mut config = small_config(dir.path().join("unused.json"));
    config.training.samples = 100;
    config.training.epochs = 5;
    let a = run_training(&config, false).unwrap();
    let b = run_training(&config, false).unwrap();
    assert_eq!(a.pipeline, b.pipeline);
    assert!(a.model_path.is_none());
    assert!(!dir.path().join("unused.json").exists());
}
