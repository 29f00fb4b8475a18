// Being Export - clinical data export orchestration engine
// Copyright (c) 2026 Being Export Contributors
// Licensed under the MIT License

//! # Being Export - Clinical Data Export Orchestration
//!
//! Being Export is the export engine behind the Being MBCT companion app. It
//! drives user-requested exports of therapeutic data (mood logs, meditation
//! sessions, thought records, assessments) through a staged workflow with
//! consent validation, clinical-safety gating, bounded error recovery, and a
//! durable, audited history with retention lifecycle.
//!
//! ## Overview
//!
//! This library provides the core functionality for:
//! - **Validating** export requests against consent records and privacy settings
//! - **Executing** export jobs (collection, rendering, checksumming)
//! - **Orchestrating** the staged workflow with weighted progress tracking
//! - **Recording** completed exports in an audited, retention-managed history
//! - **Recovering** from failures under clinical-safety constraints
//!
//! ## Architecture
//!
//! The engine follows a layered architecture:
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Business logic (consent, process, history, recovery, integration)
//! - [`adapters`] - External seams (clinical data source, snapshot storage)
//! - [`domain`] - Core domain types and models
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging and observability
//! - [`engine`] - Service-graph wiring
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use being_export::adapters::source::InMemoryDataSource;
//! use being_export::config::BeingConfig;
//! use being_export::domain::{DataCategory, DateRange, ExportFormat, UserId};
//! use being_export::domain::request::UnifiedExportRequest;
//! use being_export::engine::ExportEngine;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Load configuration and wire the engine
//!     let config = BeingConfig::from_file("being-export.toml")?;
//!     let engine = ExportEngine::new(config, Arc::new(InMemoryDataSource::new()))?;
//!     engine.load_state().await?;
//!
//!     // Submit an export
//!     let user = UserId::new("user-1")?;
//!     engine.consent.grant_consent(user.clone(), vec![DataCategory::MoodLog]).await?;
//!     let request = UnifiedExportRequest::new(
//!         user,
//!         ExportFormat::Pdf,
//!         vec![DataCategory::MoodLog],
//!         DateRange::last_days(7),
//!     );
//!     let export_id = engine.coordinator.create_unified_export(request).await?;
//!
//!     println!("Export {export_id} started");
//!     Ok(())
//! }
//! ```
//!
//! ## Workflow Stages
//!
//! Every export advances through a fixed pipeline:
//! `configuration-validation → consent-verification → data-collection →
//! clinical-validation (optional) → format-generation → quality-assurance →
//! history-recording → completion`, with `error-handling` and `recovery`
//! reachable from any stage. Overall progress is always derived from the
//! fixed per-stage weights, which sum to 100.
//!
//! ## Error Handling
//!
//! All fallible operations return [`domain::Result`] with
//! [`domain::BeingError`]. Workflow failures never escape the background
//! execution path: they are classified, paired with therapeutic guidance,
//! and handed to the recovery service, which executes bounded,
//! safety-checked recovery attempts. Errors affecting patient safety or
//! compliance always trigger a clinical review request.
//!
//! ## Logging
//!
//! Structured logging with the `tracing` crate:
//!
//! ```rust,no_run
//! use tracing::{info, warn, error};
//!
//! info!("Starting export");
//! warn!(export_id = "exp-123", "Consent expiring soon");
//! error!(error = "render failed", "Export failed");
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod engine;
pub mod logging;
