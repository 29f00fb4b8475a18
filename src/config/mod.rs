//! Configuration management.
//!
//! Loads the engine configuration from a TOML file with `${VAR}` environment
//! substitution and `BEING_*` environment overrides, then validates every
//! section before anything else starts.
//!
//! # Example
//!
//! ```no_run
//! use being_export::config::BeingConfig;
//!
//! let config = BeingConfig::from_file("being-export.toml").expect("load config");
//! assert!(config.workflow.max_concurrent_workflows >= 1);
//! ```

pub mod loader;
pub mod schema;

pub use loader::load_config;
pub use schema::{
    ApplicationConfig, BeingConfig, ConsentConfig, LoggingConfig, MaintenanceConfig,
    PrivacySettings, ProcessConfig, RecoveryConfig, RetentionConfig, StorageConfig,
    WorkflowConfig,
};
