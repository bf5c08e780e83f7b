use std::path::PathBuf;

use review_sentinel::cli::runtime::{config_candidates, load_config, LOCAL_CONFIG};

#[tokio::test]
async fn explicit_file_is_loaded_and_validated() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sentinel.yaml");
    std::fs::write(
        &path,
        "scoring:\n  endpoint: http://127.0.0.1:6000/predict\npipeline:\n  max_concurrent: 8\n  debounce_ms: 100\nlogging:\n  level: debug\n",
    )
    .unwrap();

    let loaded = load_config(Some(&path)).await.unwrap();
    assert!(loaded.from_file);
    assert_eq!(loaded.path, path);
    assert_eq!(loaded.config.scoring.endpoint, "http://127.0.0.1:6000/predict");
    assert_eq!(loaded.config.pipeline.max_concurrent, 8);
    assert_eq!(loaded.config.pipeline.options().debounce.as_millis(), 100);
    assert_eq!(loaded.config.logging.level, "debug");
}

#[tokio::test]
async fn invalid_values_are_rejected_with_the_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.yaml");
    std::fs::write(&path, "pipeline:\n  max_concurrent: 0\n").unwrap();

    let err = load_config(Some(&path)).await.err().unwrap();
    let message = format!("{err:#}");
    assert!(message.contains("bad.yaml"));
    assert!(message.contains("max_concurrent must be at least 1"));
}

#[tokio::test]
async fn missing_explicit_file_is_an_error() {
    let path = PathBuf::from("no/such/sentinel.yaml");
    assert!(load_config(Some(&path)).await.is_err());
}

#[test]
fn lookup_order_prefers_the_local_file() {
    let explicit = PathBuf::from("custom.yaml");
    assert_eq!(config_candidates(Some(&explicit)), vec![explicit.clone()]);
    let defaults = config_candidates(None);
    assert_eq!(defaults[0], PathBuf::from(LOCAL_CONFIG));
    if let Some(user) = defaults.get(1) {
        assert!(user.ends_with("review-sentinel/config.yaml"));
    }
}
