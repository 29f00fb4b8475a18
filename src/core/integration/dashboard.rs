//! Clinical export dashboard
//!
//! Read-only summary the UI layer consumes: export counts by status,
//! throughput, recent activity, and system/compliance health. Recomputed on
//! demand from the live state of all four services.

use crate::core::history::record::AuditEventType;
use crate::domain::ids::ExportId;
use crate::domain::request::ExportFormat;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Export counts by lifecycle status
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct StatusCounts {
    pub completed: u64,
    pub shared: u64,
    pub downloaded: u64,
    pub expired: u64,
    pub purged: u64,
    pub archived: u64,
}

impl StatusCounts {
    /// Total records across all statuses
    pub fn total(&self) -> u64 {
        self.completed + self.shared + self.downloaded + self.expired + self.purged + self.archived
    }
}

/// Overall engine health
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SystemHealth {
    /// No active errors
    Healthy,
    /// Active errors, none affecting patient safety
    Degraded,
    /// At least one active patient-safety error
    Critical,
}

/// Compliance posture
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceStatus {
    /// Open clinical review requests
    pub pending_clinical_reviews: u64,

    /// Active errors flagged as compliance violations
    pub unresolved_compliance_errors: u64,

    /// Last cross-store consistency verdict
    pub cross_store_consistent: bool,
}

/// One recent audit event, across all records
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentActivityEntry {
    /// Export the event belongs to
    pub export_id: ExportId,

    /// What happened
    pub event_type: AuditEventType,

    /// When it happened
    pub timestamp: DateTime<Utc>,
}

/// Dashboard summary over all four services
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClinicalExportSummary {
    /// Export counts by status
    pub status_counts: StatusCounts,

    /// Workflows currently active
    pub active_workflows: u64,

    /// Mean job duration across recorded exports
    pub average_completion_time_ms: f64,

    /// Completed exports as a percentage of completed plus active errors
    pub success_rate: f64,

    /// Format appearing most often in the history
    pub most_used_format: Option<ExportFormat>,

    /// Most recent audit events, newest first
    pub recent_activity: Vec<RecentActivityEntry>,

    /// Overall engine health
    pub system_health: SystemHealth,

    /// Compliance posture
    pub compliance: ComplianceStatus,

    /// When the summary was computed
    pub generated_at: DateTime<Utc>,
}
