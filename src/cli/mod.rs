//! CLI interface and argument parsing
//!
//! Command-line interface for the export engine using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// Being Export - clinical data export engine
#[derive(Parser, Debug)]
#[command(name = "being-export")]
#[command(version, about, long_about = None)]
#[command(author = "Being Export Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "being-export.toml", env = "BEING_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "BEING_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a unified export end to end
    Export(commands::export::ExportArgs),

    /// Validate the configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Show the clinical export dashboard
    Status(commands::status::StatusArgs),

    /// Search the export history
    History(commands::history::HistoryArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}
