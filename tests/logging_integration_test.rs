//! Integration tests for logging functionality

use quarry::adapters::catalog::SelectionManifest;
use quarry::config::LoggingConfig;
use quarry::domain::TableName;
use quarry::logging::init_logging;
use quarry::{log_phase_complete, log_phase_start, log_table_progress};
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_logging_config_default() {
    let config = LoggingConfig::default();
    assert!(config.local_enabled);
    assert_eq!(config.local_path, "/var/log/quarry");
    assert_eq!(config.local_rotation, "daily");
    assert_eq!(config.local_max_files, 14);
}

#[test]
fn test_logging_directory_not_created_before_init() {
    let temp_dir = TempDir::new().unwrap();
    let log_path = temp_dir.path().join("logs");

    let config = LoggingConfig {
        local_enabled: true,
        local_path: log_path.to_string_lossy().to_string(),
        ..LoggingConfig::default()
    };

    assert!(config.local_enabled);
    assert!(!log_path.exists());
}

#[test]
fn test_logging_macros_usage() {
    // Without a subscriber the macros are no-ops, but they must expand
    log_phase_start!("structure", "Dumping structure...");
    log_phase_complete!("structure", "Structure dumped.", Duration::from_millis(5));
    log_table_progress!(1, 3, "album", true);
    log_table_progress!(2, 3, "artist", false);
}

// The only test in this binary that installs the global subscriber
#[test]
fn test_file_logging_writes_json_lines() {
    let temp_dir = TempDir::new().unwrap();
    let log_path = temp_dir.path().join("logs");
    let config = LoggingConfig {
        local_enabled: true,
        local_path: log_path.to_string_lossy().to_string(),
        local_rotation: "never".to_string(),
        local_max_files: 2,
    };

    let guard = init_logging("debug", &config).unwrap();
    assert!(log_path.exists());

    // Emits a warning from inside the library
    let manifest = SelectionManifest::parse(r#"{"tables": {"ghost": [{"id": 1}]}}"#).unwrap();
    manifest.apply(vec![TableName::new("album").unwrap()]);

    drop(guard);

    let files: Vec<_> = std::fs::read_dir(&log_path).unwrap().collect();
    assert_eq!(files.len(), 1);
    let contents = std::fs::read_to_string(log_path.join("quarry.log")).unwrap();
    let line = contents
        .lines()
        .find(|line| line.contains("missing from the schema"))
        .expect("warning written to the log file");
    let event: serde_json::Value = serde_json::from_str(line).unwrap();
    assert_eq!(event["level"], "WARN");
}
