use std::io::Write;
use std::path::Path;

use thermo_daemon::config::{load_config, DaemonConfig};

#[test]
fn test_shipped_default_config_matches_builtin_defaults() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .join("config/default.yaml");

    let config = load_config(Some(&path)).expect("Failed to load shipped configuration");
    assert_eq!(config, DaemonConfig::default());
    assert!(config.pipeline.validate().is_ok());
}

#[test]
fn test_partial_yaml_file() {
    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    writeln!(file, "pipeline:\n  report_delay_ms: 1000\nsensor:\n  failure_rate: 0.25").unwrap();

    let config = load_config(Some(file.path())).unwrap();
    assert_eq!(config.pipeline.report_delay_ms, 1000);
    assert_eq!(config.pipeline.sampling_period_ms, 1000);
    assert_eq!(config.sensor.failure_rate, 0.25);
}

#[test]
fn test_json_file() {
    let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    write!(file, r#"{{"board": {{"max_poll_attempts": 50}}}}"#).unwrap();

    let config = load_config(Some(file.path())).unwrap();
    assert_eq!(config.board.max_poll_attempts, 50);
}

#[test]
fn test_explicit_missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_config(Some(&dir.path().join("absent.yaml"))).unwrap_err();
    assert!(err.to_string().contains("Could not read configuration file"));
}

#[test]
fn test_malformed_yaml_is_an_error() {
    let mut file = tempfile::Builder::new().suffix(".yml").tempfile().unwrap();
    writeln!(file, "pipeline: [not, a, map]").unwrap();
    assert!(load_config(Some(file.path())).is_err());
}
