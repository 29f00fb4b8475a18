//! Workflow orchestration
//!
//! The [`ExportCoordinator`] drives one export request through the fixed
//! stage pipeline, coordinating the consent, process, history, and recovery
//! services through their public operations only. Workflow progress is
//! tracked per export in [`ExportWorkflowStatus`], with overall progress
//! always derived from the fixed per-stage weights.

pub mod dashboard;
pub mod orchestrator;
pub mod workflow;

pub use dashboard::{
    ClinicalExportSummary, ComplianceStatus, RecentActivityEntry, StatusCounts, SystemHealth,
};
pub use orchestrator::{ExportCoordinator, RepairReport};
pub use workflow::{
    derive_overall_progress, ClinicalValidationState, ExportWorkflowStatus, WorkflowStage,
    WorkflowUpdate,
};
