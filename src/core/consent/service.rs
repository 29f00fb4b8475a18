//! Consent manager
//!
//! Holds consent records and privacy preferences, and gates every export
//! request through [`ConsentManager::validate_export_request`]. Nothing
//! starts a job without passing through here first.

use crate::adapters::storage::SnapshotStore;
use crate::config::{ConsentConfig, PrivacySettings};
use crate::core::consent::validation::ValidationResult;
use crate::domain::ids::{ConsentId, UserId};
use crate::domain::request::{DataCategory, ExportFormat, ExportPurpose, UnifiedExportRequest};
use crate::domain::{BeingError, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Snapshot key for the persisted consent state
pub const CONSENT_SNAPSHOT_KEY: &str = "being-export-config";

/// Schema version of the persisted consent snapshot
pub const CONSENT_SCHEMA_VERSION: u32 = 2;

/// A user's consent to export a set of data categories
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsentRecord {
    /// Consent identifier
    pub id: ConsentId,

    /// User the consent belongs to
    pub user_id: UserId,

    /// Categories the consent covers
    pub categories: Vec<DataCategory>,

    /// When the consent was granted
    pub granted_at: DateTime<Utc>,

    /// When the consent lapses
    pub expires_at: DateTime<Utc>,

    /// Whether the user withdrew the consent
    pub revoked: bool,
}

impl ConsentRecord {
    /// Whether the consent is usable right now
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        !self.revoked && now < self.expires_at
    }

    /// Whether the consent covers a category
    pub fn covers(&self, category: DataCategory) -> bool {
        self.categories.contains(&category)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ConsentSnapshot {
    version: u32,
    consents: Vec<ConsentRecord>,
    privacy: PrivacySettings,
}

#[derive(Debug)]
struct ConsentState {
    consents: HashMap<ConsentId, ConsentRecord>,
    privacy: PrivacySettings,
}

/// Consent and privacy-preference service
///
/// Validates export requests against held consent records and privacy
/// settings, returning a structured [`ValidationResult`] rather than
/// throwing. Persisted via the snapshot store under a versioned key.
pub struct ConsentManager {
    state: RwLock<ConsentState>,
    store: Arc<dyn SnapshotStore>,
    config: ConsentConfig,
}

impl ConsentManager {
    /// Create a manager with the given backends and settings
    pub fn new(
        store: Arc<dyn SnapshotStore>,
        config: ConsentConfig,
        privacy: PrivacySettings,
    ) -> Self {
        Self {
            state: RwLock::new(ConsentState {
                consents: HashMap::new(),
                privacy,
            }),
            store,
            config,
        }
    }

    /// Load persisted consent state, discarding snapshots with a stale schema
    pub async fn load(&self) -> Result<()> {
        let Some(value) = self.store.load(CONSENT_SNAPSHOT_KEY).await? else {
            tracing::debug!("No persisted consent state found");
            return Ok(());
        };

        let snapshot: ConsentSnapshot = match serde_json::from_value(value) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(error = %e, "Discarding unreadable consent snapshot");
                return Ok(());
            }
        };

        if snapshot.version != CONSENT_SCHEMA_VERSION {
            tracing::warn!(
                found = snapshot.version,
                expected = CONSENT_SCHEMA_VERSION,
                "Consent snapshot schema mismatch - starting fresh"
            );
            return Ok(());
        }

        let mut state = self.state.write().await;
        state.consents = snapshot
            .consents
            .into_iter()
            .map(|c| (c.id.clone(), c))
            .collect();
        state.privacy = snapshot.privacy;

        tracing::info!(consents = state.consents.len(), "Consent state loaded");
        Ok(())
    }

    /// Persist the current consent state
    pub async fn persist(&self) -> Result<()> {
        let state = self.state.read().await;
        let snapshot = ConsentSnapshot {
            version: CONSENT_SCHEMA_VERSION,
            consents: state.consents.values().cloned().collect(),
            privacy: state.privacy.clone(),
        };
        let value = serde_json::to_value(&snapshot)?;
        drop(state);

        self.store.save(CONSENT_SNAPSHOT_KEY, &value).await
    }

    /// Grant consent for a set of categories, valid per configuration
    pub async fn grant_consent(
        &self,
        user_id: UserId,
        categories: Vec<DataCategory>,
    ) -> Result<ConsentId> {
        if categories.is_empty() {
            return Err(BeingError::Consent(
                "Consent must cover at least one category".to_string(),
            ));
        }

        let now = Utc::now();
        let record = ConsentRecord {
            id: ConsentId::generate(),
            user_id,
            categories,
            granted_at: now,
            expires_at: now + Duration::days(self.config.consent_validity_days),
            revoked: false,
        };
        let id = record.id.clone();

        tracing::info!(
            consent_id = %id,
            user_id = %record.user_id,
            categories = record.categories.len(),
            "Consent granted"
        );

        self.state.write().await.consents.insert(id.clone(), record);
        Ok(id)
    }

    /// Revoke a consent record
    pub async fn revoke_consent(&self, consent_id: &ConsentId) -> Result<()> {
        let mut state = self.state.write().await;
        let record = state
            .consents
            .get_mut(consent_id)
            .ok_or_else(|| BeingError::NotFound(format!("Consent {consent_id}")))?;
        record.revoked = true;

        tracing::info!(consent_id = %consent_id, "Consent revoked");
        Ok(())
    }

    /// Active (unexpired, unrevoked) consents for a user
    pub async fn active_consents(&self, user_id: &UserId) -> Vec<ConsentRecord> {
        let now = Utc::now();
        self.state
            .read()
            .await
            .consents
            .values()
            .filter(|c| &c.user_id == user_id && c.is_active(now))
            .cloned()
            .collect()
    }

    /// Pure predicate: is every category covered by an active consent?
    pub async fn check_consent_validity(
        &self,
        user_id: &UserId,
        categories: &[DataCategory],
    ) -> bool {
        let now = Utc::now();
        let state = self.state.read().await;
        categories.iter().all(|category| {
            state
                .consents
                .values()
                .any(|c| &c.user_id == user_id && c.is_active(now) && c.covers(*category))
        })
    }

    /// Validate an export request
    ///
    /// Returns a structured result; an invalid request is an expected
    /// outcome, not an `Err`.
    pub async fn validate_export_request(
        &self,
        request: &UnifiedExportRequest,
    ) -> ValidationResult {
        let mut result = ValidationResult::ok();
        let now = Utc::now();

        if request.categories.is_empty() {
            result.add_error("categories", "At least one data category is required");
        }

        let mut seen = Vec::new();
        for category in &request.categories {
            if seen.contains(category) {
                result.add_error("categories", format!("Duplicate category '{category}'"));
            }
            seen.push(*category);
        }

        if request.date_range.start > request.date_range.end {
            result.add_error("date_range", "Range start is after range end");
        }
        if request.date_range.start > now {
            result.add_error("date_range", "Range cannot start in the future");
        }

        if request.estimated_record_count > self.config.max_estimated_records {
            result.add_error(
                "estimated_record_count",
                format!(
                    "Estimated record count {} exceeds the limit of {}",
                    request.estimated_record_count, self.config.max_estimated_records
                ),
            );
        }

        if request.purpose == ExportPurpose::Migration && request.format == ExportFormat::Summary {
            result.add_error(
                "format",
                "Summary format cannot carry a full data migration",
            );
        }

        let state = self.state.read().await;

        if matches!(
            request.purpose,
            ExportPurpose::ProviderSharing | ExportPurpose::ClinicalReview
        ) && !state.privacy.allow_sharing
        {
            result.add_error("purpose", "Sharing is disabled by privacy settings");
        }

        if state.privacy.require_consent_per_category {
            for category in &request.categories {
                let covered = state.consents.values().any(|c| {
                    c.user_id == request.user_id && c.is_active(now) && c.covers(*category)
                });
                if !covered {
                    result.add_error(
                        "consent",
                        format!("No active consent covers category '{category}'"),
                    );
                }
            }
        }

        if !result.valid {
            tracing::warn!(
                export_id = %request.export_id,
                errors = result.errors.len(),
                "Export request failed validation"
            );
        }

        result
    }

    /// Current privacy settings
    pub async fn privacy_settings(&self) -> PrivacySettings {
        self.state.read().await.privacy.clone()
    }

    /// Replace the privacy settings
    pub async fn update_privacy_settings(&self, privacy: PrivacySettings) {
        self.state.write().await.privacy = privacy;
    }

    /// Number of held consent records (active or not)
    pub async fn consent_count(&self) -> usize {
        self.state.read().await.consents.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::storage::MemorySnapshotStore;
    use crate::domain::request::DateRange;

    fn user() -> UserId {
        UserId::new("user-1").unwrap()
    }

    fn manager() -> ConsentManager {
        ConsentManager::new(
            Arc::new(MemorySnapshotStore::new()),
            ConsentConfig::default(),
            PrivacySettings::default(),
        )
    }

    fn request(categories: Vec<DataCategory>) -> UnifiedExportRequest {
        UnifiedExportRequest::new(
            user(),
            ExportFormat::Pdf,
            categories,
            DateRange::last_days(7),
        )
    }

    #[tokio::test]
    async fn test_grant_and_check_consent() {
        let manager = manager();
        manager
            .grant_consent(user(), vec![DataCategory::MoodLog])
            .await
            .unwrap();

        assert!(
            manager
                .check_consent_validity(&user(), &[DataCategory::MoodLog])
                .await
        );
        assert!(
            !manager
                .check_consent_validity(&user(), &[DataCategory::TherapyNotes])
                .await
        );
    }

    #[tokio::test]
    async fn test_revoked_consent_no_longer_covers() {
        let manager = manager();
        let id = manager
            .grant_consent(user(), vec![DataCategory::MoodLog])
            .await
            .unwrap();

        manager.revoke_consent(&id).await.unwrap();
        assert!(
            !manager
                .check_consent_validity(&user(), &[DataCategory::MoodLog])
                .await
        );
    }

    #[tokio::test]
    async fn test_validate_valid_request() {
        let manager = manager();
        manager
            .grant_consent(user(), vec![DataCategory::MoodLog])
            .await
            .unwrap();

        let result = manager
            .validate_export_request(&request(vec![DataCategory::MoodLog]))
            .await;
        assert!(result.valid, "unexpected errors: {}", result.summary());
    }

    #[tokio::test]
    async fn test_validate_empty_categories() {
        let manager = manager();
        let result = manager.validate_export_request(&request(vec![])).await;

        assert!(!result.valid);
        assert!(result.errors.iter().any(|e| e.field == "categories"));
    }

    #[tokio::test]
    async fn test_validate_missing_consent() {
        let manager = manager();
        let result = manager
            .validate_export_request(&request(vec![DataCategory::MoodLog]))
            .await;

        assert!(!result.valid);
        assert!(result.errors.iter().any(|e| e.field == "consent"));
    }

    #[tokio::test]
    async fn test_validate_duplicate_categories() {
        let manager = manager();
        manager
            .grant_consent(user(), vec![DataCategory::MoodLog])
            .await
            .unwrap();

        let result = manager
            .validate_export_request(&request(vec![
                DataCategory::MoodLog,
                DataCategory::MoodLog,
            ]))
            .await;

        assert!(!result.valid);
    }

    #[tokio::test]
    async fn test_validate_summary_migration_rejected() {
        let manager = manager();
        manager
            .grant_consent(user(), vec![DataCategory::MoodLog])
            .await
            .unwrap();

        let req = UnifiedExportRequest::new(
            user(),
            ExportFormat::Summary,
            vec![DataCategory::MoodLog],
            DateRange::last_days(7),
        )
        .with_purpose(ExportPurpose::Migration);

        let result = manager.validate_export_request(&req).await;
        assert!(!result.valid);
        assert!(result.errors.iter().any(|e| e.field == "format"));
    }

    #[tokio::test]
    async fn test_validate_sharing_disabled() {
        let manager = ConsentManager::new(
            Arc::new(MemorySnapshotStore::new()),
            ConsentConfig::default(),
            PrivacySettings {
                allow_sharing: false,
                ..PrivacySettings::default()
            },
        );
        manager
            .grant_consent(user(), vec![DataCategory::MoodLog])
            .await
            .unwrap();

        let req = request(vec![DataCategory::MoodLog]).with_purpose(ExportPurpose::ProviderSharing);
        let result = manager.validate_export_request(&req).await;

        assert!(!result.valid);
        assert!(result.errors.iter().any(|e| e.field == "purpose"));
    }

    #[tokio::test]
    async fn test_persist_and_load_roundtrip() {
        let store = Arc::new(MemorySnapshotStore::new());
        let manager = ConsentManager::new(
            store.clone(),
            ConsentConfig::default(),
            PrivacySettings::default(),
        );
        manager
            .grant_consent(user(), vec![DataCategory::MoodLog])
            .await
            .unwrap();
        manager.persist().await.unwrap();

        let restored = ConsentManager::new(
            store,
            ConsentConfig::default(),
            PrivacySettings::default(),
        );
        restored.load().await.unwrap();

        assert_eq!(restored.consent_count().await, 1);
        assert!(
            restored
                .check_consent_validity(&user(), &[DataCategory::MoodLog])
                .await
        );
    }

    #[tokio::test]
    async fn test_load_discards_version_mismatch() {
        let store = Arc::new(MemorySnapshotStore::new());
        store
            .save(
                CONSENT_SNAPSHOT_KEY,
                &serde_json::json!({
                    "version": CONSENT_SCHEMA_VERSION + 1,
                    "consents": [],
                    "privacy": PrivacySettings::default(),
                }),
            )
            .await
            .unwrap();

        let manager = ConsentManager::new(
            store,
            ConsentConfig::default(),
            PrivacySettings::default(),
        );
        manager.load().await.unwrap();
        assert_eq!(manager.consent_count().await, 0);
    }
}
