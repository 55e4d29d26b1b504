use std::fs::write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

use purr::load_config::{load_config, FileConfig};

/// A full config file maps every key onto FileConfig.
#[test]
fn test_load_config_success_reads_all_keys() {
    let config_yaml = r#"
output_dir: ./tmp/combined
max_size: 1048576
extension: htm
minify: true
markdown: false
jobs: 3
buffer_size: 4096
"#;
    let config_file = NamedTempFile::new().expect("temp file");
    write(config_file.path(), config_yaml).unwrap();

    let config = load_config(config_file.path()).expect("Config should load");

    assert_eq!(config.output_dir, Some(PathBuf::from("./tmp/combined")));
    assert_eq!(config.max_size, Some(1_048_576));
    assert_eq!(config.extension.as_deref(), Some("htm"));
    assert_eq!(config.minify, Some(true));
    assert_eq!(config.markdown, Some(false));
    assert_eq!(config.jobs, Some(3));
    assert_eq!(config.buffer_size, Some(4096));
}

/// Missing keys stay unset so CLI defaults apply.
#[test]
fn test_load_config_partial_and_empty_files() {
    let config_file = NamedTempFile::new().expect("temp file");
    write(config_file.path(), "minify: true\n").unwrap();
    let config = load_config(config_file.path()).unwrap();
    assert_eq!(
        config,
        FileConfig {
            minify: Some(true),
            ..FileConfig::default()
        }
    );

    let empty = NamedTempFile::new().expect("temp file");
    assert_eq!(load_config(empty.path()).unwrap(), FileConfig::default());
}

/// Invalid YAML and unknown keys are reported as parse errors.
#[test]
fn test_load_config_errors_for_invalid_file() {
    let config_file = NamedTempFile::new().expect("temp file");
    write(config_file.path(), b"not-yaml: [:::").unwrap();
    let msg = load_config(config_file.path()).unwrap_err().to_string();
    assert!(
        msg.contains("parse") || msg.contains("YAML"),
        "Parse error expected, got: {msg}"
    );

    write(config_file.path(), b"max_sise: 10\n").unwrap();
    let msg = load_config(config_file.path()).unwrap_err().to_string();
    assert!(msg.contains("YAML"), "Unknown key should fail, got: {msg}");
}

#[test]
fn test_load_config_errors_for_missing_file() {
    let msg = load_config("definitely/not/here.yaml")
        .unwrap_err()
        .to_string();
    assert!(msg.contains("Failed to read config file"), "got: {msg}");
}
