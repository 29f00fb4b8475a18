//! Integration tests for configuration loading and validation
//!
//! Note: Tests that modify environment variables should be run with
//! --test-threads=1 to avoid interference between tests.

use being_export::config::load_config;
use std::io::Write;
use std::sync::Mutex;
use tempfile::NamedTempFile;

// Mutex to serialize tests that modify environment variables
static ENV_MUTEX: Mutex<()> = Mutex::new(());

/// Helper function to clean up environment variables
fn cleanup_env_vars() {
    std::env::remove_var("BEING_APPLICATION_LOG_LEVEL");
    std::env::remove_var("BEING_APPLICATION_DRY_RUN");
    std::env::remove_var("BEING_WORKFLOW_MAX_CONCURRENT_WORKFLOWS");
    std::env::remove_var("BEING_RECOVERY_MAX_RECOVERY_ATTEMPTS");
    std::env::remove_var("BEING_STORAGE_STATE_DIR");
    std::env::remove_var("BEING_TEST_STATE_DIR");
}

#[test]
fn test_load_complete_config() {
    let _lock = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();

    let toml_content = r#"
[application]
log_level = "debug"
dry_run = true

[workflow]
max_concurrent_workflows = 5
enable_clinical_validation = false
cleanup_delay_ms = 1000

[process]
batch_size = 500
enable_checksum = false

[consent]
consent_validity_days = 180
max_estimated_records = 50000

[privacy]
allow_sharing = false
require_consent_per_category = true
show_technical_details = true

[retention]
default_retention_days = 365
expiring_soon_days = 14
cleanup_grace_days = 3

[recovery]
max_recovery_attempts = 5
error_retention_days = 14
error_rate_threshold = 0.5

[maintenance]
enabled = false
threshold_check_interval_secs = 60
cleanup_interval_secs = 120
pattern_interval_secs = 60
sync_interval_secs = 30

[storage]
state_dir = "/tmp/being-state"

[logging]
local_enabled = false
local_path = "/tmp/being-logs"
local_rotation = "hourly"
"#;

    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(toml_content.as_bytes()).unwrap();
    temp_file.flush().unwrap();

    let config = load_config(temp_file.path()).expect("Failed to load config");

    assert_eq!(config.application.log_level, "debug");
    assert!(config.application.dry_run);
    assert_eq!(config.workflow.max_concurrent_workflows, 5);
    assert!(!config.workflow.enable_clinical_validation);
    assert_eq!(config.process.batch_size, 500);
    assert!(!config.process.enable_checksum);
    assert_eq!(config.consent.consent_validity_days, 180);
    assert!(!config.privacy.allow_sharing);
    assert!(config.privacy.show_technical_details);
    assert_eq!(config.retention.default_retention_days, 365);
    assert_eq!(config.retention.expiring_soon_days, 14);
    assert_eq!(config.recovery.max_recovery_attempts, 5);
    assert!(!config.maintenance.enabled);
    assert_eq!(config.storage.state_dir, "/tmp/being-state");
    assert_eq!(config.logging.local_rotation, "hourly");
}

#[test]
fn test_minimal_config_uses_defaults() {
    let _lock = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();

    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(b"[application]\nlog_level = \"info\"\n").unwrap();
    temp_file.flush().unwrap();

    let config = load_config(temp_file.path()).expect("Failed to load config");

    assert_eq!(config.workflow.max_concurrent_workflows, 3);
    assert!(config.workflow.enable_clinical_validation);
    assert_eq!(config.recovery.max_recovery_attempts, 3);
    assert_eq!(config.retention.expiring_soon_days, 30);
    assert_eq!(config.storage.state_dir, "./state");
}

#[test]
fn test_env_overrides_take_precedence() {
    let _lock = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();

    std::env::set_var("BEING_APPLICATION_LOG_LEVEL", "trace");
    std::env::set_var("BEING_WORKFLOW_MAX_CONCURRENT_WORKFLOWS", "9");
    std::env::set_var("BEING_RECOVERY_MAX_RECOVERY_ATTEMPTS", "7");

    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file
        .write_all(b"[application]\nlog_level = \"info\"\n[workflow]\nmax_concurrent_workflows = 2\n")
        .unwrap();
    temp_file.flush().unwrap();

    let config = load_config(temp_file.path()).expect("Failed to load config");

    assert_eq!(config.application.log_level, "trace");
    assert_eq!(config.workflow.max_concurrent_workflows, 9);
    assert_eq!(config.recovery.max_recovery_attempts, 7);

    cleanup_env_vars();
}

#[test]
fn test_env_substitution_in_values() {
    let _lock = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();

    std::env::set_var("BEING_TEST_STATE_DIR", "/tmp/substituted");

    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file
        .write_all(b"[storage]\nstate_dir = \"${BEING_TEST_STATE_DIR}\"\n")
        .unwrap();
    temp_file.flush().unwrap();

    let config = load_config(temp_file.path()).expect("Failed to load config");
    assert_eq!(config.storage.state_dir, "/tmp/substituted");

    cleanup_env_vars();
}

#[test]
fn test_invalid_config_rejected() {
    let _lock = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();

    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file
        .write_all(b"[recovery]\nerror_rate_threshold = 3.0\n")
        .unwrap();
    temp_file.flush().unwrap();

    assert!(load_config(temp_file.path()).is_err());
}

#[test]
fn test_missing_file_rejected() {
    let result = load_config("definitely-not-a-real-file.toml");
    assert!(result.is_err());
}
