//! Configuration schema types
//!
//! Defines the configuration structure for the export engine. The root
//! [`BeingConfig`] maps to the `being-export.toml` file.

use serde::{Deserialize, Serialize};

/// Main configuration
///
/// This is the root configuration structure that maps to the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BeingConfig {
    /// Application-level settings
    #[serde(default)]
    pub application: ApplicationConfig,

    /// Workflow orchestration settings
    #[serde(default)]
    pub workflow: WorkflowConfig,

    /// Export process settings
    #[serde(default)]
    pub process: ProcessConfig,

    /// Consent validation settings
    #[serde(default)]
    pub consent: ConsentConfig,

    /// Privacy preferences
    #[serde(default)]
    pub privacy: PrivacySettings,

    /// Retention policy settings
    #[serde(default)]
    pub retention: RetentionConfig,

    /// Error recovery settings
    #[serde(default)]
    pub recovery: RecoveryConfig,

    /// Background maintenance settings
    #[serde(default)]
    pub maintenance: MaintenanceConfig,

    /// Snapshot storage settings
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl BeingConfig {
    /// Loads and validates configuration from a TOML file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::domain::Result<Self> {
        crate::config::loader::load_config(path)
    }

    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid
    pub fn validate(&self) -> Result<(), String> {
        self.application.validate()?;
        self.workflow.validate()?;
        self.process.validate()?;
        self.consent.validate()?;
        self.retention.validate()?;
        self.recovery.validate()?;
        self.maintenance.validate()?;
        self.storage.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Dry run mode (run the workflow but discard rendered payloads)
    #[serde(default)]
    pub dry_run: bool,
}

impl ApplicationConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }
        Ok(())
    }
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            dry_run: false,
        }
    }
}

/// Workflow orchestration configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Maximum number of concurrently active workflows
    #[serde(default = "default_max_concurrent_workflows")]
    pub max_concurrent_workflows: usize,

    /// Whether the clinical-validation stage runs
    #[serde(default = "default_true")]
    pub enable_clinical_validation: bool,

    /// Delay before a finished workflow is removed from the active map
    #[serde(default = "default_cleanup_delay_ms")]
    pub cleanup_delay_ms: u64,
}

impl WorkflowConfig {
    fn validate(&self) -> Result<(), String> {
        if self.max_concurrent_workflows == 0 {
            return Err("max_concurrent_workflows must be at least 1".to_string());
        }
        Ok(())
    }
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            max_concurrent_workflows: default_max_concurrent_workflows(),
            enable_clinical_validation: true,
            cleanup_delay_ms: default_cleanup_delay_ms(),
        }
    }
}

/// Export process configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessConfig {
    /// Records collected per progress step
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Whether a SHA-256 checksum is computed for rendered payloads
    #[serde(default = "default_true")]
    pub enable_checksum: bool,
}

impl ProcessConfig {
    fn validate(&self) -> Result<(), String> {
        if self.batch_size == 0 {
            return Err("batch_size must be at least 1".to_string());
        }
        if self.batch_size > 5000 {
            return Err("batch_size must not exceed 5000".to_string());
        }
        Ok(())
    }
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            enable_checksum: true,
        }
    }
}

/// Consent validation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsentConfig {
    /// Days a granted consent remains valid
    #[serde(default = "default_consent_validity_days")]
    pub consent_validity_days: i64,

    /// Upper bound on a request's estimated record count
    #[serde(default = "default_max_estimated_records")]
    pub max_estimated_records: u64,
}

impl ConsentConfig {
    fn validate(&self) -> Result<(), String> {
        if self.consent_validity_days <= 0 {
            return Err("consent_validity_days must be positive".to_string());
        }
        if self.max_estimated_records == 0 {
            return Err("max_estimated_records must be at least 1".to_string());
        }
        Ok(())
    }
}

impl Default for ConsentConfig {
    fn default() -> Self {
        Self {
            consent_validity_days: default_consent_validity_days(),
            max_estimated_records: default_max_estimated_records(),
        }
    }
}

/// Privacy preferences held by the consent manager
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrivacySettings {
    /// Whether exports may be shared with recipients at all
    #[serde(default = "default_true")]
    pub allow_sharing: bool,

    /// Whether every requested category must be covered by consent
    #[serde(default = "default_true")]
    pub require_consent_per_category: bool,

    /// Opt-in: surface raw technical error detail to the user
    #[serde(default)]
    pub show_technical_details: bool,
}

impl Default for PrivacySettings {
    fn default() -> Self {
        Self {
            allow_sharing: true,
            require_consent_per_category: true,
            show_technical_details: false,
        }
    }
}

/// Retention policy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionConfig {
    /// Days a completed export record is retained
    #[serde(default = "default_retention_days")]
    pub default_retention_days: i64,

    /// Window (days) within which an expiry counts as "expiring soon"
    #[serde(default = "default_expiring_soon_days")]
    pub expiring_soon_days: i64,

    /// Grace period (days) between expiry and scheduled purge
    #[serde(default = "default_cleanup_grace_days")]
    pub cleanup_grace_days: i64,
}

impl RetentionConfig {
    fn validate(&self) -> Result<(), String> {
        if self.default_retention_days <= 0 {
            return Err("default_retention_days must be positive".to_string());
        }
        if self.expiring_soon_days < 0 || self.cleanup_grace_days < 0 {
            return Err("retention windows must not be negative".to_string());
        }
        Ok(())
    }
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            default_retention_days: default_retention_days(),
            expiring_soon_days: default_expiring_soon_days(),
            cleanup_grace_days: default_cleanup_grace_days(),
        }
    }
}

/// Error recovery configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveryConfig {
    /// Maximum recovery attempts per export
    #[serde(default = "default_max_recovery_attempts")]
    pub max_recovery_attempts: u32,

    /// Days resolved errors are retained before cleanup
    #[serde(default = "default_error_retention_days")]
    pub error_retention_days: i64,

    /// Failed-attempt fraction above which a threshold warning fires
    #[serde(default = "default_error_rate_threshold")]
    pub error_rate_threshold: f64,
}

impl RecoveryConfig {
    fn validate(&self) -> Result<(), String> {
        if self.max_recovery_attempts == 0 {
            return Err("max_recovery_attempts must be at least 1".to_string());
        }
        if !(0.0..=1.0).contains(&self.error_rate_threshold) {
            return Err("error_rate_threshold must be between 0.0 and 1.0".to_string());
        }
        Ok(())
    }
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            max_recovery_attempts: default_max_recovery_attempts(),
            error_retention_days: default_error_retention_days(),
            error_rate_threshold: default_error_rate_threshold(),
        }
    }
}

/// Background maintenance configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceConfig {
    /// Whether the maintenance scheduler starts at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Interval between error-rate threshold checks (seconds)
    #[serde(default = "default_threshold_interval_secs")]
    pub threshold_check_interval_secs: u64,

    /// Interval between retention/error cleanup sweeps (seconds)
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,

    /// Interval between error-pattern re-analyses (seconds)
    #[serde(default = "default_pattern_interval_secs")]
    pub pattern_interval_secs: u64,

    /// Interval between store syncs and consistency checks (seconds)
    #[serde(default = "default_sync_interval_secs")]
    pub sync_interval_secs: u64,
}

impl MaintenanceConfig {
    fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("threshold_check_interval_secs", self.threshold_check_interval_secs),
            ("cleanup_interval_secs", self.cleanup_interval_secs),
            ("pattern_interval_secs", self.pattern_interval_secs),
            ("sync_interval_secs", self.sync_interval_secs),
        ] {
            if value == 0 {
                return Err(format!("{name} must be at least 1"));
            }
        }
        Ok(())
    }
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold_check_interval_secs: default_threshold_interval_secs(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
            pattern_interval_secs: default_pattern_interval_secs(),
            sync_interval_secs: default_sync_interval_secs(),
        }
    }
}

/// Snapshot storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding snapshot files
    #[serde(default = "default_state_dir")]
    pub state_dir: String,
}

impl StorageConfig {
    fn validate(&self) -> Result<(), String> {
        if self.state_dir.trim().is_empty() {
            return Err("state_dir must not be empty".to_string());
        }
        Ok(())
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            state_dir: default_state_dir(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Enable local file logging
    #[serde(default)]
    pub local_enabled: bool,

    /// Directory for local log files
    #[serde(default = "default_log_path")]
    pub local_path: String,

    /// Rotation policy ("daily" or "hourly")
    #[serde(default = "default_rotation")]
    pub local_rotation: String,
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_rotations = ["daily", "hourly"];
        if !valid_rotations.contains(&self.local_rotation.as_str()) {
            return Err(format!(
                "Invalid local_rotation '{}'. Must be one of: {}",
                self.local_rotation,
                valid_rotations.join(", ")
            ));
        }
        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_enabled: false,
            local_path: default_log_path(),
            local_rotation: default_rotation(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_max_concurrent_workflows() -> usize {
    3
}

fn default_cleanup_delay_ms() -> u64 {
    30_000
}

fn default_batch_size() -> usize {
    250
}

fn default_consent_validity_days() -> i64 {
    365
}

fn default_max_estimated_records() -> u64 {
    100_000
}

fn default_retention_days() -> i64 {
    730
}

fn default_expiring_soon_days() -> i64 {
    30
}

fn default_cleanup_grace_days() -> i64 {
    7
}

fn default_max_recovery_attempts() -> u32 {
    3
}

fn default_error_retention_days() -> i64 {
    30
}

fn default_error_rate_threshold() -> f64 {
    0.25
}

fn default_threshold_interval_secs() -> u64 {
    3600
}

fn default_cleanup_interval_secs() -> u64 {
    86_400
}

fn default_pattern_interval_secs() -> u64 {
    3600
}

fn default_sync_interval_secs() -> u64 {
    900
}

fn default_state_dir() -> String {
    "./state".to_string()
}

fn default_log_path() -> String {
    "./logs".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = BeingConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_log_level() {
        let mut config = BeingConfig::default();
        config.application.log_level = "verbose".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_concurrent_workflows_rejected() {
        let mut config = BeingConfig::default();
        config.workflow.max_concurrent_workflows = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_batch_size_bounds() {
        let mut config = BeingConfig::default();
        config.process.batch_size = 0;
        assert!(config.validate().is_err());

        config.process.batch_size = 10_000;
        assert!(config.validate().is_err());

        config.process.batch_size = 500;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_error_rate_threshold_bounds() {
        let mut config = BeingConfig::default();
        config.recovery.error_rate_threshold = 1.5;
        assert!(config.validate().is_err());

        config.recovery.error_rate_threshold = 0.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_rotation() {
        let mut config = BeingConfig::default();
        config.logging.local_rotation = "weekly".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_minimal_toml() {
        let config: BeingConfig = toml::from_str("").unwrap();
        assert_eq!(config.workflow.max_concurrent_workflows, 3);
        assert!(config.workflow.enable_clinical_validation);
        assert_eq!(config.recovery.max_recovery_attempts, 3);
        assert_eq!(config.retention.expiring_soon_days, 30);
    }

    #[test]
    fn test_parse_partial_toml() {
        let config: BeingConfig = toml::from_str(
            r#"
[workflow]
max_concurrent_workflows = 8
enable_clinical_validation = false

[recovery]
max_recovery_attempts = 5
"#,
        )
        .unwrap();

        assert_eq!(config.workflow.max_concurrent_workflows, 8);
        assert!(!config.workflow.enable_clinical_validation);
        assert_eq!(config.recovery.max_recovery_attempts, 5);
        // Untouched sections keep defaults
        assert_eq!(config.process.batch_size, 250);
    }
}
