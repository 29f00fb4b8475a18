//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::BeingConfig;
use crate::domain::errors::BeingError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into BeingConfig
/// 4. Applies environment variable overrides (BEING_* prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns an error if:
/// - File cannot be read
/// - TOML parsing fails
/// - Environment variable substitution fails
/// - Configuration validation fails
///
/// # Examples
///
/// ```no_run
/// use being_export::config::load_config;
///
/// let config = load_config("being-export.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<BeingConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(BeingError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        BeingError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    let contents = substitute_env_vars(&contents)?;

    let mut config: BeingConfig = toml::from_str(&contents)
        .map_err(|e| BeingError::Configuration(format!("Failed to parse TOML: {e}")))?;

    apply_env_overrides(&mut config);

    config.validate().map_err(|e| {
        BeingError::Configuration(format!("Configuration validation failed: {e}"))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are left untouched. Returns an error if a referenced
/// environment variable is not set.
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("static regex");
    let mut result = String::new();
    let mut missing_vars = Vec::new();

    for line in input.lines() {
        let trimmed = line.trim_start();

        // Skip comment lines - don't process env vars in comments
        if trimmed.starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    let placeholder = format!("${{{var_name}}}");
                    processed_line = processed_line.replace(&placeholder, &value);
                }
                Err(_) => {
                    if !missing_vars.contains(&var_name.to_string()) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        result.push_str(&processed_line);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(BeingError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

/// Applies environment variable overrides using the BEING_* prefix
///
/// Environment variables follow the pattern: BEING_<SECTION>_<KEY>
/// For example: BEING_WORKFLOW_MAX_CONCURRENT_WORKFLOWS, BEING_STORAGE_STATE_DIR
fn apply_env_overrides(config: &mut BeingConfig) {
    // Application overrides
    if let Ok(val) = std::env::var("BEING_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }
    if let Ok(val) = std::env::var("BEING_APPLICATION_DRY_RUN") {
        config.application.dry_run = val.parse().unwrap_or(false);
    }

    // Workflow overrides
    if let Ok(val) = std::env::var("BEING_WORKFLOW_MAX_CONCURRENT_WORKFLOWS") {
        if let Ok(n) = val.parse() {
            config.workflow.max_concurrent_workflows = n;
        }
    }
    if let Ok(val) = std::env::var("BEING_WORKFLOW_ENABLE_CLINICAL_VALIDATION") {
        config.workflow.enable_clinical_validation = val.parse().unwrap_or(true);
    }
    if let Ok(val) = std::env::var("BEING_WORKFLOW_CLEANUP_DELAY_MS") {
        if let Ok(n) = val.parse() {
            config.workflow.cleanup_delay_ms = n;
        }
    }

    // Process overrides
    if let Ok(val) = std::env::var("BEING_PROCESS_BATCH_SIZE") {
        if let Ok(n) = val.parse() {
            config.process.batch_size = n;
        }
    }
    if let Ok(val) = std::env::var("BEING_PROCESS_ENABLE_CHECKSUM") {
        config.process.enable_checksum = val.parse().unwrap_or(true);
    }

    // Recovery overrides
    if let Ok(val) = std::env::var("BEING_RECOVERY_MAX_RECOVERY_ATTEMPTS") {
        if let Ok(n) = val.parse() {
            config.recovery.max_recovery_attempts = n;
        }
    }
    if let Ok(val) = std::env::var("BEING_RECOVERY_ERROR_RATE_THRESHOLD") {
        if let Ok(n) = val.parse() {
            config.recovery.error_rate_threshold = n;
        }
    }

    // Retention overrides
    if let Ok(val) = std::env::var("BEING_RETENTION_DEFAULT_RETENTION_DAYS") {
        if let Ok(n) = val.parse() {
            config.retention.default_retention_days = n;
        }
    }

    // Privacy overrides
    if let Ok(val) = std::env::var("BEING_PRIVACY_ALLOW_SHARING") {
        config.privacy.allow_sharing = val.parse().unwrap_or(true);
    }
    if let Ok(val) = std::env::var("BEING_PRIVACY_SHOW_TECHNICAL_DETAILS") {
        config.privacy.show_technical_details = val.parse().unwrap_or(false);
    }

    // Storage overrides
    if let Ok(val) = std::env::var("BEING_STORAGE_STATE_DIR") {
        config.storage.state_dir = val;
    }

    // Maintenance overrides
    if let Ok(val) = std::env::var("BEING_MAINTENANCE_ENABLED") {
        config.maintenance.enabled = val.parse().unwrap_or(true);
    }

    // Logging overrides
    if let Ok(val) = std::env::var("BEING_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = val.parse().unwrap_or(false);
    }
    if let Ok(val) = std::env::var("BEING_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_substitute_env_vars() {
        std::env::set_var("BEING_TEST_VAR", "test_value");
        let input = "state_dir = \"${BEING_TEST_VAR}\"";
        let result = substitute_env_vars(input).unwrap();
        assert_eq!(result, "state_dir = \"test_value\"\n");
        std::env::remove_var("BEING_TEST_VAR");
    }

    #[test]
    fn test_substitute_env_vars_missing() {
        std::env::remove_var("BEING_MISSING_VAR");
        let input = "state_dir = \"${BEING_MISSING_VAR}\"";
        let result = substitute_env_vars(input);
        assert!(result.is_err());
    }

    #[test]
    fn test_substitute_skips_comments() {
        std::env::remove_var("BEING_COMMENTED_VAR");
        let input = "# state_dir = \"${BEING_COMMENTED_VAR}\"";
        let result = substitute_env_vars(input).unwrap();
        assert!(result.contains("BEING_COMMENTED_VAR"));
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config("nonexistent.toml");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_valid() {
        let toml_content = r#"
[application]
log_level = "debug"

[workflow]
max_concurrent_workflows = 4

[storage]
state_dir = "/tmp/being-state"
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = load_config(temp_file.path()).expect("Failed to load config");
        assert_eq!(config.application.log_level, "debug");
        assert_eq!(config.workflow.max_concurrent_workflows, 4);
        assert_eq!(config.storage.state_dir, "/tmp/being-state");
    }

    #[test]
    fn test_load_config_invalid_values() {
        let toml_content = r#"
[workflow]
max_concurrent_workflows = 0
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        assert!(load_config(temp_file.path()).is_err());
    }
}
