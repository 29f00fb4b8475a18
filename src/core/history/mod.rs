//! Durable export history
//!
//! Audited record-keeping for completed exports: CRUD with a mandatory audit
//! trail, sharing records with access logs, retention lifecycle, in-memory
//! search, and analytics. The [`HistoryManager`] persists through the
//! snapshot store under a versioned key.

pub mod analytics;
pub mod record;
pub mod search;
pub mod service;
pub mod sharing;

pub use analytics::{
    CategoryUsage, HistoryAnalytics, PerformanceAggregate, RetentionCompliance, SharingPattern,
    TrendBucket,
};
pub use record::{
    AuditEvent, AuditEventType, ClinicalMetadata, ConfigSnapshot, ExportHistoryRecord,
    ExportHistoryRecordBuilder, ExportRecordStatus, QualityMetrics, RetentionInfo,
};
pub use search::{SearchCriteria, SearchResults, SortField, SortOrder};
pub use service::{
    ExportRecordUpdate, HistoryManager, NewShare, HISTORY_SCHEMA_VERSION, HISTORY_SNAPSHOT_KEY,
    PERSISTED_RECORD_CAP,
};
pub use sharing::{
    AccessPermissions, RecipientInfo, RecipientType, ShareAccessEvent, ShareAccessKind,
    ShareMethod, SharingHistoryRecord, SharingStatus,
};
