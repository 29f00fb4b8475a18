//! Logging and observability
//!
//! Structured logging with support for:
//! - Configurable log levels
//! - Console output for development
//! - Local JSON file logging with rotation
//!
//! # Example
//!
//! ```no_run
//! use being_export::logging::init_logging;
//! use being_export::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!("Engine started");
//! tracing::error!(error = "Something went wrong", "Error occurred");
//! ```

pub mod structured;

// Re-export commonly used items
pub use structured::{init_logging, LoggingGuard};
