//! History manager
//!
//! Durable record-keeping for completed exports: CRUD with a mandatory audit
//! trail, sharing records, retention lifecycle, search, analytics, and
//! integrity checks. Persisted through the snapshot store under a versioned
//! key; stale schemas are discarded rather than migrated.

use crate::adapters::storage::SnapshotStore;
use crate::config::RetentionConfig;
use crate::core::history::analytics::{generate_analytics, HistoryAnalytics};
use crate::core::history::record::{
    AuditEvent, AuditEventType, ClinicalMetadata, ExportHistoryRecord, ExportRecordStatus,
    QualityMetrics,
};
use crate::core::history::search::{search_records, SearchCriteria, SearchResults};
use crate::core::history::sharing::{
    AccessPermissions, RecipientInfo, ShareAccessKind, ShareMethod, SharingHistoryRecord,
    SharingStatus,
};
use crate::domain::ids::{ConsentId, ExportId, ShareId};
use crate::domain::{BeingError, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Snapshot key for the persisted history state
pub const HISTORY_SNAPSHOT_KEY: &str = "being-export-history";

/// Schema version of the persisted history snapshot
pub const HISTORY_SCHEMA_VERSION: u32 = 3;

/// Persisted export records are capped at this many, most recent first
pub const PERSISTED_RECORD_CAP: usize = 100;

/// Partial update applied to an export record
#[derive(Debug, Clone, Default)]
pub struct ExportRecordUpdate {
    /// New lifecycle status
    pub status: Option<ExportRecordStatus>,

    /// New quality scores
    pub quality: Option<QualityMetrics>,

    /// New clinical metadata
    pub clinical: Option<ClinicalMetadata>,

    /// New payload size (adjusts the storage counter)
    pub file_size: Option<u64>,
}

/// Inputs for creating a sharing record
#[derive(Debug, Clone)]
pub struct NewShare {
    /// Parent export
    pub export_id: ExportId,

    /// Who receives the share
    pub recipient: RecipientInfo,

    /// Delivery method
    pub method: ShareMethod,

    /// Consent authorizing the share
    pub consent_id: ConsentId,

    /// Recipient permissions
    pub permissions: AccessPermissions,

    /// When the share lapses
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct HistorySnapshot {
    version: u32,
    exports: Vec<ExportHistoryRecord>,
    sharing: Vec<SharingHistoryRecord>,
    total_storage_used: u64,
}

#[derive(Default)]
struct HistoryState {
    exports: HashMap<ExportId, ExportHistoryRecord>,
    sharing: HashMap<ShareId, SharingHistoryRecord>,
    total_storage_used: u64,
}

/// Durable, audited export history
pub struct HistoryManager {
    state: RwLock<HistoryState>,
    store: Arc<dyn SnapshotStore>,
    retention: RetentionConfig,
}

impl HistoryManager {
    /// Create a manager over a snapshot store
    pub fn new(store: Arc<dyn SnapshotStore>, retention: RetentionConfig) -> Self {
        Self {
            state: RwLock::new(HistoryState::default()),
            store,
            retention,
        }
    }

    /// Load persisted history, discarding snapshots with a stale schema
    pub async fn load(&self) -> Result<()> {
        let Some(value) = self.store.load(HISTORY_SNAPSHOT_KEY).await? else {
            tracing::debug!("No persisted history found");
            return Ok(());
        };

        let snapshot: HistorySnapshot = match serde_json::from_value(value) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(error = %e, "Discarding unreadable history snapshot");
                return Ok(());
            }
        };

        if snapshot.version != HISTORY_SCHEMA_VERSION {
            tracing::warn!(
                found = snapshot.version,
                expected = HISTORY_SCHEMA_VERSION,
                "History snapshot schema mismatch - starting fresh"
            );
            return Ok(());
        }

        let mut state = self.state.write().await;
        state.exports = snapshot
            .exports
            .into_iter()
            .map(|r| (r.id.clone(), r))
            .collect();
        state.sharing = snapshot
            .sharing
            .into_iter()
            .map(|s| (s.id.clone(), s))
            .collect();
        state.total_storage_used = snapshot.total_storage_used;

        tracing::info!(
            exports = state.exports.len(),
            shares = state.sharing.len(),
            "Export history loaded"
        );
        Ok(())
    }

    /// Persist the history, capping exports at the most recent
    /// [`PERSISTED_RECORD_CAP`] records to bound storage growth
    pub async fn persist(&self) -> Result<()> {
        let value = {
            let state = self.state.read().await;

            let mut exports: Vec<ExportHistoryRecord> = state.exports.values().cloned().collect();
            exports.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            exports.truncate(PERSISTED_RECORD_CAP);

            let kept: std::collections::HashSet<&ExportId> =
                exports.iter().map(|r| &r.id).collect();
            let sharing: Vec<SharingHistoryRecord> = state
                .sharing
                .values()
                .filter(|s| kept.contains(&s.export_history_id))
                .cloned()
                .collect();

            serde_json::to_value(&HistorySnapshot {
                version: HISTORY_SCHEMA_VERSION,
                exports,
                sharing,
                total_storage_used: state.total_storage_used,
            })?
        };

        self.store.save(HISTORY_SNAPSHOT_KEY, &value).await
    }

    /// Add a completed export record
    ///
    /// # Errors
    ///
    /// Returns an error if a record with the same ID already exists.
    pub async fn add_export_record(&self, record: ExportHistoryRecord) -> Result<()> {
        let mut state = self.state.write().await;
        if state.exports.contains_key(&record.id) {
            return Err(BeingError::History(format!(
                "History record {} already exists",
                record.id
            )));
        }

        state.total_storage_used += record.file_size;
        tracing::info!(
            export_id = %record.id,
            file_size = record.file_size,
            total_storage = state.total_storage_used,
            "Export record added"
        );
        state.exports.insert(record.id.clone(), record);
        Ok(())
    }

    /// Apply a partial update, appending a `modified` audit event
    pub async fn update_export_record(
        &self,
        export_id: &ExportId,
        update: ExportRecordUpdate,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        let mut storage_delta: i64 = 0;

        let record = state
            .exports
            .get_mut(export_id)
            .ok_or_else(|| BeingError::NotFound(format!("History record {export_id}")))?;

        let mut changes = Vec::new();
        if let Some(status) = update.status {
            if record.status != status {
                changes.push(format!("status -> {status:?}"));
                record.status = status;
            }
        }
        if let Some(quality) = update.quality {
            record.quality = quality;
            changes.push("quality".to_string());
        }
        if let Some(clinical) = update.clinical {
            record.clinical = clinical;
            changes.push("clinical".to_string());
        }
        if let Some(file_size) = update.file_size {
            storage_delta = file_size as i64 - record.file_size as i64;
            record.file_size = file_size;
            changes.push(format!("file_size -> {file_size}"));
        }

        record.append_audit(AuditEvent::new(
            AuditEventType::Modified,
            format!("Updated: {}", changes.join(", ")),
        ));

        state.total_storage_used = (state.total_storage_used as i64 + storage_delta).max(0) as u64;
        Ok(())
    }

    /// Remove a record and cascade-delete its sharing records
    pub async fn remove_export_record(&self, export_id: &ExportId) -> Result<()> {
        let mut state = self.state.write().await;
        let record = state
            .exports
            .remove(export_id)
            .ok_or_else(|| BeingError::NotFound(format!("History record {export_id}")))?;

        state.total_storage_used = state.total_storage_used.saturating_sub(record.file_size);
        state
            .sharing
            .retain(|_, share| &share.export_history_id != export_id);

        tracing::info!(export_id = %export_id, "Export record removed");
        Ok(())
    }

    /// Record a user download: bumps access count and flips status
    pub async fn record_download(&self, export_id: &ExportId) -> Result<()> {
        let mut state = self.state.write().await;
        let record = state
            .exports
            .get_mut(export_id)
            .ok_or_else(|| BeingError::NotFound(format!("History record {export_id}")))?;

        record.access_count += 1;
        record.status = ExportRecordStatus::Downloaded;
        record.append_audit(AuditEvent::new(
            AuditEventType::Downloaded,
            "Payload downloaded by user",
        ));
        Ok(())
    }

    /// Move a record to the archive
    pub async fn archive_export(&self, export_id: &ExportId) -> Result<()> {
        let mut state = self.state.write().await;
        let record = state
            .exports
            .get_mut(export_id)
            .ok_or_else(|| BeingError::NotFound(format!("History record {export_id}")))?;

        record.status = ExportRecordStatus::Archived;
        record.append_audit(AuditEvent::new(AuditEventType::Archived, "Record archived"));
        Ok(())
    }

    /// Mark the record's clinical review as completed
    pub async fn mark_review_completed(
        &self,
        export_id: &ExportId,
        notes: impl Into<String>,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        let record = state
            .exports
            .get_mut(export_id)
            .ok_or_else(|| BeingError::NotFound(format!("History record {export_id}")))?;

        record.clinical.review_status = crate::domain::clinical::ReviewStatus::Completed;
        record.append_audit(AuditEvent::new(AuditEventType::ReviewCompleted, notes.into()));
        Ok(())
    }

    /// Create a sharing record against an existing export
    ///
    /// Appends a `shared` audit event to the parent and flips its status to
    /// `Shared`.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent export does not exist.
    pub async fn add_sharing_record(&self, new_share: NewShare) -> Result<ShareId> {
        let mut state = self.state.write().await;

        let record = state
            .exports
            .get_mut(&new_share.export_id)
            .ok_or_else(|| {
                BeingError::NotFound(format!("History record {}", new_share.export_id))
            })?;

        record.status = ExportRecordStatus::Shared;
        record.append_audit(AuditEvent::new(
            AuditEventType::Shared,
            format!(
                "Shared with {} ({:?}) via {:?}",
                new_share.recipient.name, new_share.recipient.recipient_type, new_share.method
            ),
        ));

        let share = SharingHistoryRecord::new(
            new_share.export_id,
            new_share.recipient,
            new_share.method,
            new_share.consent_id,
            new_share.permissions,
            new_share.expires_at,
        );
        let share_id = share.id.clone();

        tracing::info!(share_id = %share_id, export_id = %share.export_history_id, "Sharing record created");
        state.sharing.insert(share_id.clone(), share);
        Ok(share_id)
    }

    /// Record recipient access against a share
    pub async fn record_share_access(
        &self,
        share_id: &ShareId,
        kind: ShareAccessKind,
        details: impl Into<String>,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        let share = state
            .sharing
            .get_mut(share_id)
            .ok_or_else(|| BeingError::NotFound(format!("Share {share_id}")))?;

        if !share.record_access(kind, details) {
            return Err(BeingError::History(format!(
                "Share {share_id} is no longer active"
            )));
        }
        Ok(())
    }

    /// Revoke a share
    pub async fn revoke_share(&self, share_id: &ShareId) -> Result<()> {
        let mut state = self.state.write().await;
        let share = state
            .sharing
            .get_mut(share_id)
            .ok_or_else(|| BeingError::NotFound(format!("Share {share_id}")))?;
        share.revoke();

        tracing::info!(share_id = %share_id, "Share revoked");
        Ok(())
    }

    /// Mark time-lapsed shares as expired; returns how many flipped
    pub async fn expire_lapsed_shares(&self) -> usize {
        let now = Utc::now();
        let mut state = self.state.write().await;
        let mut flipped = 0;
        for share in state.sharing.values_mut() {
            if !share.status.is_terminal() && now > share.expires_at {
                share.status = SharingStatus::Expired;
                flipped += 1;
            }
        }
        flipped
    }

    /// Filter/sort/paginate over the history
    pub async fn search_exports(&self, criteria: &SearchCriteria) -> SearchResults {
        let records: Vec<ExportHistoryRecord> =
            self.state.read().await.exports.values().cloned().collect();
        search_records(records, criteria)
    }

    /// Compute the analytics report
    pub async fn generate_analytics(&self) -> HistoryAnalytics {
        let state = self.state.read().await;
        let records: Vec<ExportHistoryRecord> = state.exports.values().cloned().collect();
        let sharing: Vec<SharingHistoryRecord> = state.sharing.values().cloned().collect();
        generate_analytics(
            &records,
            &sharing,
            state.total_storage_used,
            self.retention.expiring_soon_days,
        )
    }

    /// Schedule a record for removal by a future cleanup sweep
    pub async fn schedule_export_cleanup(
        &self,
        export_id: &ExportId,
        purge_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        let record = state
            .exports
            .get_mut(export_id)
            .ok_or_else(|| BeingError::NotFound(format!("History record {export_id}")))?;

        record.retention.scheduled_purge_at = Some(purge_at);
        record.append_audit(AuditEvent::new(
            AuditEventType::Modified,
            format!("Cleanup scheduled for {purge_at}"),
        ));
        Ok(())
    }

    /// Delete records whose scheduled purge date has passed
    ///
    /// Returns how many records were removed. Each removal is logged with a
    /// `purged` audit event before the record is dropped.
    pub async fn perform_scheduled_cleanup(&self) -> usize {
        let now = Utc::now();
        let mut state = self.state.write().await;

        let due: Vec<ExportId> = state
            .exports
            .values()
            .filter(|r| {
                r.retention
                    .scheduled_purge_at
                    .map(|at| at <= now)
                    .unwrap_or(false)
            })
            .map(|r| r.id.clone())
            .collect();

        for export_id in &due {
            if let Some(mut record) = state.exports.remove(export_id) {
                record.append_audit(AuditEvent::new(
                    AuditEventType::Purged,
                    "Removed by scheduled cleanup",
                ));
                state.total_storage_used =
                    state.total_storage_used.saturating_sub(record.file_size);
                state
                    .sharing
                    .retain(|_, share| &share.export_history_id != export_id);
                tracing::info!(export_id = %export_id, "Record removed by scheduled cleanup");
            }
        }

        due.len()
    }

    /// Mark records past their expiration date as `Purged`
    ///
    /// Returns the IDs that transitioned. Purged records stay in the map
    /// (payload-free tombstones) until scheduled cleanup removes them.
    pub async fn purge_expired_exports(&self) -> Vec<ExportId> {
        let now = Utc::now();
        let grace = Duration::days(self.retention.cleanup_grace_days);
        let mut state = self.state.write().await;
        let mut purged = Vec::new();

        let mut storage_freed: u64 = 0;
        for record in state.exports.values_mut() {
            if record.is_expired(now) && record.status != ExportRecordStatus::Purged {
                record.status = ExportRecordStatus::Purged;
                storage_freed += record.file_size;
                record.file_size = 0;
                record.retention.scheduled_purge_at = Some(now + grace);
                record.append_audit(AuditEvent::new(
                    AuditEventType::Purged,
                    "Retention expired - payload purged",
                ));
                purged.push(record.id.clone());
            }
        }
        state.total_storage_used = state.total_storage_used.saturating_sub(storage_freed);

        if !purged.is_empty() {
            tracing::info!(count = purged.len(), "Expired exports purged");
        }
        purged
    }

    /// Push a record's expiration forward by `days`
    pub async fn extend_retention(&self, export_id: &ExportId, days: i64) -> Result<()> {
        if days <= 0 {
            return Err(BeingError::History(
                "Retention extension must be positive".to_string(),
            ));
        }

        let mut state = self.state.write().await;
        let record = state
            .exports
            .get_mut(export_id)
            .ok_or_else(|| BeingError::NotFound(format!("History record {export_id}")))?;

        record.retention.expiration_date += Duration::days(days);
        record.retention.scheduled_purge_at = None;
        record.append_audit(AuditEvent::new(
            AuditEventType::RetentionExtended,
            format!("Retention extended by {days} days"),
        ));
        Ok(())
    }

    /// Check referential integrity: every share must point at an existing
    /// export record
    pub async fn validate_history_integrity(&self) -> bool {
        let state = self.state.read().await;
        let orphans = state
            .sharing
            .values()
            .filter(|s| !state.exports.contains_key(&s.export_history_id))
            .count();

        if orphans > 0 {
            tracing::warn!(orphans, "History integrity violation: orphaned sharing records");
        }
        orphans == 0
    }

    /// Remove orphaned sharing records; returns how many were dropped
    ///
    /// Idempotent: a second run on a consistent store removes nothing.
    pub async fn repair_history_data(&self) -> usize {
        let mut state = self.state.write().await;
        let before = state.sharing.len();
        let exports = &state.exports;
        let orphan_ids: Vec<ShareId> = state
            .sharing
            .values()
            .filter(|s| !exports.contains_key(&s.export_history_id))
            .map(|s| s.id.clone())
            .collect();
        for id in &orphan_ids {
            state.sharing.remove(id);
        }
        let removed = before - state.sharing.len();

        if removed > 0 {
            tracing::warn!(removed, "Removed orphaned sharing records");
        }
        removed
    }

    /// Fetch one record
    pub async fn export_record(&self, export_id: &ExportId) -> Option<ExportHistoryRecord> {
        self.state.read().await.exports.get(export_id).cloned()
    }

    /// Fetch one sharing record
    pub async fn sharing_record(&self, share_id: &ShareId) -> Option<SharingHistoryRecord> {
        self.state.read().await.sharing.get(share_id).cloned()
    }

    /// All records, unsorted
    pub async fn all_records(&self) -> Vec<ExportHistoryRecord> {
        self.state.read().await.exports.values().cloned().collect()
    }

    /// Number of records held
    pub async fn export_count(&self) -> usize {
        self.state.read().await.exports.len()
    }

    /// Current storage counter value
    pub async fn total_storage_used(&self) -> u64 {
        self.state.read().await.total_storage_used
    }
}
