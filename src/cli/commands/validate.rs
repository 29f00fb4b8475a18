//! Validate config command implementation

use crate::config::load_config;
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        let config = match load_config(config_path) {
            Ok(c) => {
                println!("✅ Configuration file loaded successfully");
                c
            }
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        match config.validate() {
            Ok(_) => {
                println!("✅ Configuration is valid");
                println!();
                println!("Configuration Summary:");
                println!("  Log Level: {}", config.application.log_level);
                println!("  Dry Run: {}", config.application.dry_run);
                println!(
                    "  Max Concurrent Workflows: {}",
                    config.workflow.max_concurrent_workflows
                );
                println!(
                    "  Clinical Validation: {}",
                    config.workflow.enable_clinical_validation
                );
                println!("  Batch Size: {}", config.process.batch_size);
                println!(
                    "  Retention: {} days (expiring-soon window {} days)",
                    config.retention.default_retention_days, config.retention.expiring_soon_days
                );
                println!(
                    "  Max Recovery Attempts: {}",
                    config.recovery.max_recovery_attempts
                );
                println!("  State Directory: {}", config.storage.state_dir);
                println!();
                Ok(0)
            }
            Err(e) => {
                println!("❌ Configuration validation failed");
                println!("   Error: {e}");
                println!();
                Ok(2)
            }
        }
    }
}
