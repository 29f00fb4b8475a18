//! Export job results
//!
//! The types an export job produces on completion: the rendered payload, its
//! checksum, and performance metrics consumed by the workflow and recorded
//! in history.

use crate::domain::ids::ExportId;
use crate::domain::request::ExportFormat;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Timing metrics for one export job run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    /// When the job started
    pub started_at: DateTime<Utc>,

    /// When the job finished
    pub completed_at: DateTime<Utc>,

    /// Wall-clock duration in milliseconds
    pub duration_ms: u64,

    /// Collection + render throughput
    pub records_per_second: f64,
}

impl PerformanceMetrics {
    /// Compute metrics from the run window and record count
    pub fn from_run(
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        record_count: u64,
    ) -> Self {
        let duration_ms = (completed_at - started_at).num_milliseconds().max(0) as u64;
        let records_per_second = if duration_ms == 0 {
            record_count as f64 * 1000.0
        } else {
            record_count as f64 * 1000.0 / duration_ms as f64
        };
        Self {
            started_at,
            completed_at,
            duration_ms,
            records_per_second,
        }
    }
}

/// Result of a completed export job
#[derive(Debug, Clone)]
pub struct ExportResult {
    /// Export this result belongs to
    pub export_id: ExportId,

    /// Format actually rendered (may differ from the request after a
    /// fallback-format recovery)
    pub format: ExportFormat,

    /// Rendered payload bytes (empty in dry-run mode)
    pub payload: Vec<u8>,

    /// Number of records included
    pub record_count: u64,

    /// Payload size in bytes
    pub file_size: u64,

    /// SHA-256 checksum of the payload, when enabled
    pub checksum: Option<String>,

    /// Timing metrics for the run
    pub performance: PerformanceMetrics,
}

/// SHA-256 checksum of a payload, hex-encoded
pub fn compute_checksum(payload: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(payload);
    let result = hasher.finalize();
    format!("{result:x}")
}
