//! Export history records
//!
//! The durable record of a completed export: what was exported, how well it
//! came out, its clinical weight, its retention window, and an append-only
//! audit trail of everything that ever happened to it.

use crate::core::process::PerformanceMetrics;
use crate::domain::clinical::{ClinicalSignificance, ReviewStatus, RiskLevel};
use crate::domain::ids::{ExportId, UserId};
use crate::domain::request::{DataCategory, DateRange, ExportFormat, ExportPurpose};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of an export history record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExportRecordStatus {
    /// Export finished and is available
    Completed,
    /// Export has been shared with a recipient
    Shared,
    /// User downloaded the payload
    Downloaded,
    /// Retention expired but the record is not yet purged
    Expired,
    /// Payload removed by retention policy
    Purged,
    /// Record moved to long-term archive
    Archived,
}

/// Kind of audit trail event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuditEventType {
    Created,
    Modified,
    Shared,
    Downloaded,
    StatusChanged,
    RetentionExtended,
    ReviewCompleted,
    Purged,
    Archived,
}

/// One immutable audit trail entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Event identifier
    pub id: String,

    /// What happened
    pub event_type: AuditEventType,

    /// When it happened
    pub timestamp: DateTime<Utc>,

    /// Who did it, when known
    pub actor: Option<String>,

    /// Free-text detail
    pub details: String,
}

impl AuditEvent {
    /// Create an event stamped with the current time
    pub fn new(event_type: AuditEventType, details: impl Into<String>) -> Self {
        Self {
            id: format!("audit-{}", Uuid::new_v4()),
            event_type,
            timestamp: Utc::now(),
            actor: None,
            details: details.into(),
        }
    }

    /// Attach the acting party
    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }
}

/// Quality scores for an export, each in 0.0-1.0
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct QualityMetrics {
    /// How much of the requested data made it into the export
    pub data_completeness: f64,

    /// Fidelity of the rendered data to the source
    pub clinical_accuracy: f64,

    /// Conformance of the payload to its format
    pub format_compliance: f64,

    /// Readability/accessibility of the output
    pub accessibility_score: f64,
}

impl QualityMetrics {
    /// Weighted overall quality score
    ///
    /// Weights: completeness 0.3, clinical accuracy 0.4, format compliance
    /// 0.2, accessibility 0.1.
    pub fn overall_score(&self) -> f64 {
        0.3 * self.data_completeness
            + 0.4 * self.clinical_accuracy
            + 0.2 * self.format_compliance
            + 0.1 * self.accessibility_score
    }
}

impl Default for QualityMetrics {
    fn default() -> Self {
        Self {
            data_completeness: 1.0,
            clinical_accuracy: 1.0,
            format_compliance: 1.0,
            accessibility_score: 1.0,
        }
    }
}

/// Clinical metadata attached to an export record
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ClinicalMetadata {
    /// Risk level of the exported data
    pub risk_level: RiskLevel,

    /// Clinical significance of the record
    pub clinical_significance: ClinicalSignificance,

    /// Whether a clinical review is attached and where it stands
    pub review_status: ReviewStatus,
}

/// Retention bookkeeping for an export record
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetentionInfo {
    /// When the record's retention lapses
    pub expiration_date: DateTime<Utc>,

    /// Whether the record may be purged without user confirmation
    pub auto_delete: bool,

    /// When a cleanup sweep should remove the record entirely
    pub scheduled_purge_at: Option<DateTime<Utc>>,
}

/// Snapshot of the request configuration the export ran with
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    /// Requested format
    pub format: ExportFormat,

    /// Requested categories
    pub categories: Vec<DataCategory>,

    /// Stated purpose
    pub purpose: ExportPurpose,

    /// Covered date range
    pub date_range: DateRange,

    /// Whether clinical validation ran for this export
    pub clinical_validation_enabled: bool,
}

/// One completed/shared export in the durable history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportHistoryRecord {
    /// Export identifier
    pub id: ExportId,

    /// Owning user
    pub user_id: UserId,

    /// Format actually rendered
    pub format: ExportFormat,

    /// Categories included
    pub categories: Vec<DataCategory>,

    /// Number of records in the export
    pub record_count: u64,

    /// Payload size in bytes
    pub file_size: u64,

    /// SHA-256 checksum of the payload, when computed
    pub checksum: Option<String>,

    /// Lifecycle status
    pub status: ExportRecordStatus,

    /// Request configuration snapshot
    pub config_snapshot: ConfigSnapshot,

    /// Quality scores
    pub quality: QualityMetrics,

    /// Clinical metadata
    pub clinical: ClinicalMetadata,

    /// Retention bookkeeping
    pub retention: RetentionInfo,

    /// Timing metrics from the job run
    pub performance: PerformanceMetrics,

    /// How many times the export was opened or downloaded
    pub access_count: u64,

    /// When the record was created
    pub created_at: DateTime<Utc>,

    /// When the record was last mutated
    pub updated_at: DateTime<Utc>,

    /// Append-only audit trail
    pub audit_trail: Vec<AuditEvent>,
}

impl ExportHistoryRecord {
    /// Append an audit event and stamp the update time
    pub fn append_audit(&mut self, event: AuditEvent) {
        self.updated_at = event.timestamp;
        self.audit_trail.push(event);
    }

    /// Whether retention has lapsed as of `now`
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.retention.expiration_date
    }

    /// Whether retention lapses within the given window
    pub fn expires_within(&self, now: DateTime<Utc>, days: i64) -> bool {
        !self.is_expired(now) && self.retention.expiration_date <= now + Duration::days(days)
    }
}

/// Builder for [`ExportHistoryRecord`]
pub struct ExportHistoryRecordBuilder {
    id: ExportId,
    user_id: UserId,
    format: ExportFormat,
    categories: Vec<DataCategory>,
    config_snapshot: ConfigSnapshot,
    record_count: u64,
    file_size: u64,
    checksum: Option<String>,
    quality: QualityMetrics,
    clinical: ClinicalMetadata,
    performance: PerformanceMetrics,
    retention_days: i64,
    auto_delete: bool,
}

impl ExportHistoryRecordBuilder {
    /// Start a builder from the identifying fields
    pub fn new(
        id: ExportId,
        user_id: UserId,
        format: ExportFormat,
        categories: Vec<DataCategory>,
        config_snapshot: ConfigSnapshot,
        performance: PerformanceMetrics,
    ) -> Self {
        Self {
            id,
            user_id,
            format,
            categories,
            config_snapshot,
            record_count: 0,
            file_size: 0,
            checksum: None,
            quality: QualityMetrics::default(),
            clinical: ClinicalMetadata::default(),
            performance,
            retention_days: 730,
            auto_delete: true,
        }
    }

    /// Set record count and payload size
    pub fn counts(mut self, record_count: u64, file_size: u64) -> Self {
        self.record_count = record_count;
        self.file_size = file_size;
        self
    }

    /// Set the payload checksum
    pub fn checksum(mut self, checksum: Option<String>) -> Self {
        self.checksum = checksum;
        self
    }

    /// Set quality scores
    pub fn quality(mut self, quality: QualityMetrics) -> Self {
        self.quality = quality;
        self
    }

    /// Set clinical metadata
    pub fn clinical(mut self, clinical: ClinicalMetadata) -> Self {
        self.clinical = clinical;
        self
    }

    /// Set the retention window in days
    pub fn retention_days(mut self, days: i64) -> Self {
        self.retention_days = days;
        self
    }

    /// Set whether the record may be auto-purged
    pub fn auto_delete(mut self, auto_delete: bool) -> Self {
        self.auto_delete = auto_delete;
        self
    }

    /// Build the record, opening its audit trail with a `created` event
    ///
    /// The expiration date is clamped to never precede `created_at`.
    pub fn build(self) -> ExportHistoryRecord {
        let created_at = Utc::now();
        let expiration_date = created_at + Duration::days(self.retention_days.max(0));

        ExportHistoryRecord {
            id: self.id.clone(),
            user_id: self.user_id,
            format: self.format,
            categories: self.categories,
            record_count: self.record_count,
            file_size: self.file_size,
            checksum: self.checksum,
            status: ExportRecordStatus::Completed,
            config_snapshot: self.config_snapshot,
            quality: self.quality,
            clinical: self.clinical,
            retention: RetentionInfo {
                expiration_date,
                auto_delete: self.auto_delete,
                scheduled_purge_at: None,
            },
            performance: self.performance,
            access_count: 0,
            created_at,
            updated_at: created_at,
            audit_trail: vec![AuditEvent::new(
                AuditEventType::Created,
                format!("Export {} recorded", self.id),
            )],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    pub(crate) fn sample_record(id: &str) -> ExportHistoryRecord {
        let export_id = ExportId::new(id).unwrap();
        let user_id = UserId::new("user-1").unwrap();
        let range = DateRange::last_days(7);
        let now = Utc::now();

        ExportHistoryRecordBuilder::new(
            export_id,
            user_id,
            ExportFormat::Pdf,
            vec![DataCategory::MoodLog],
            ConfigSnapshot {
                format: ExportFormat::Pdf,
                categories: vec![DataCategory::MoodLog],
                purpose: ExportPurpose::PersonalRecord,
                date_range: range,
                clinical_validation_enabled: true,
            },
            PerformanceMetrics::from_run(now, now, 10),
        )
        .counts(10, 2048)
        .build()
    }

    #[test]
    fn test_builder_opens_audit_trail() {
        let record = sample_record("exp-1");
        assert_eq!(record.audit_trail.len(), 1);
        assert_eq!(record.audit_trail[0].event_type, AuditEventType::Created);
        assert_eq!(record.status, ExportRecordStatus::Completed);
    }

    #[test]
    fn test_expiration_never_precedes_creation() {
        let export_id = ExportId::new("exp-neg").unwrap();
        let user_id = UserId::new("user-1").unwrap();
        let now = Utc::now();
        let record = ExportHistoryRecordBuilder::new(
            export_id,
            user_id,
            ExportFormat::Csv,
            vec![DataCategory::MoodLog],
            ConfigSnapshot {
                format: ExportFormat::Csv,
                categories: vec![DataCategory::MoodLog],
                purpose: ExportPurpose::PersonalRecord,
                date_range: DateRange::last_days(7),
                clinical_validation_enabled: false,
            },
            PerformanceMetrics::from_run(now, now, 0),
        )
        .retention_days(-5)
        .build();

        assert!(record.retention.expiration_date >= record.created_at);
    }

    #[test]
    fn test_append_audit_stamps_update_time() {
        let mut record = sample_record("exp-2");
        let before = record.updated_at;

        record.append_audit(AuditEvent::new(AuditEventType::Downloaded, "downloaded"));
        assert_eq!(record.audit_trail.len(), 2);
        assert!(record.updated_at >= before);
    }

    #[test]
    fn test_expiry_predicates() {
        let mut record = sample_record("exp-3");
        let now = Utc::now();

        assert!(!record.is_expired(now));

        record.retention.expiration_date = now - Duration::days(1);
        assert!(record.is_expired(now));
        assert!(!record.expires_within(now, 30));

        record.retention.expiration_date = now + Duration::days(10);
        assert!(record.expires_within(now, 30));
        assert!(!record.expires_within(now, 5));
    }

    #[test_case(1.0, 1.0, 1.0, 1.0, 1.0; "all perfect")]
    #[test_case(0.0, 0.0, 0.0, 0.0, 0.0; "all zero")]
    #[test_case(1.0, 0.0, 0.0, 0.0, 0.3; "completeness only")]
    #[test_case(0.0, 1.0, 0.0, 0.0, 0.4; "accuracy only")]
    #[test_case(0.0, 0.0, 1.0, 0.0, 0.2; "compliance only")]
    #[test_case(0.0, 0.0, 0.0, 1.0, 0.1; "accessibility only")]
    fn test_quality_score_weights(
        completeness: f64,
        accuracy: f64,
        compliance: f64,
        accessibility: f64,
        expected: f64,
    ) {
        let metrics = QualityMetrics {
            data_completeness: completeness,
            clinical_accuracy: accuracy,
            format_compliance: compliance,
            accessibility_score: accessibility,
        };
        assert!((metrics.overall_score() - expected).abs() < 1e-9);
    }
}
