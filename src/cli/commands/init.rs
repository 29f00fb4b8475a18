//! Init command implementation
//!
//! Generates a commented sample configuration file.

use clap::Args;
use std::fs;
use std::path::Path;

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path where to create the configuration file
    #[arg(short, long, default_value = "being-export.toml")]
    pub output: String,

    /// Overwrite existing file
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    /// Execute the init command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(output = %self.output, "Initializing configuration file");

        println!("📝 Initializing Being Export configuration");
        println!();

        if Path::new(&self.output).exists() && !self.force {
            println!("❌ Configuration file already exists: {}", self.output);
            println!("   Use --force to overwrite");
            return Ok(2);
        }

        match fs::write(&self.output, Self::generate_default_config()) {
            Ok(_) => {
                println!("✅ Configuration file created: {}", self.output);
                println!();
                println!("Next steps:");
                println!("  1. Edit {} with your settings", self.output);
                println!("  2. Validate configuration: being-export validate-config");
                println!("  3. Run an export: being-export export --categories mood-log");
                println!();
                Ok(0)
            }
            Err(e) => {
                println!("❌ Failed to write configuration file");
                println!("   Error: {e}");
                Ok(5)
            }
        }
    }

    /// Generate the default configuration with comments
    fn generate_default_config() -> String {
        r#"# Being Export Configuration File
# Export orchestration engine for the Being companion app

[application]
log_level = "info"
dry_run = false

[workflow]
# How many exports may run concurrently
max_concurrent_workflows = 3
# Whether the clinical-validation stage runs
enable_clinical_validation = true
# Delay before a finished workflow leaves the active map (ms)
cleanup_delay_ms = 30000

[process]
batch_size = 250
enable_checksum = true

[consent]
consent_validity_days = 365
max_estimated_records = 100000

[privacy]
allow_sharing = true
require_consent_per_category = true
# Opt-in: surface raw technical error detail
show_technical_details = false

[retention]
default_retention_days = 730
expiring_soon_days = 30
cleanup_grace_days = 7

[recovery]
max_recovery_attempts = 3
error_retention_days = 30
error_rate_threshold = 0.25

[maintenance]
enabled = true
threshold_check_interval_secs = 3600
cleanup_interval_secs = 86400
pattern_interval_secs = 3600
sync_interval_secs = 900

[storage]
state_dir = "./state"

[logging]
local_enabled = false
local_path = "./logs"
local_rotation = "daily"
"#
        .to_string()
    }
}
