//! Core business logic.
//!
//! The five cooperating services of the export engine:
//!
//! - [`consent`] - consent records, privacy settings, request validation
//! - [`process`] - export job execution lifecycle
//! - [`history`] - durable, audited export history with retention
//! - [`recovery`] - error classification and bounded, safety-checked recovery
//! - [`integration`] - the workflow orchestrator tying the four together
//!
//! plus [`maintenance`], the lifecycle-managed background scheduler.
//!
//! The integration coordinator holds typed handles to the other services
//! and only ever calls their public operations; the dependency graph is
//! visible in constructor signatures, not hidden behind globals.

pub mod consent;
pub mod history;
pub mod integration;
pub mod maintenance;
pub mod process;
pub mod recovery;

pub use maintenance::MaintenanceScheduler;
