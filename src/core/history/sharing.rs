//! Sharing records
//!
//! One record per share action against an export, owned by (and
//! cascade-deleted with) its parent [`ExportHistoryRecord`]. Recipient
//! contact details are stored as a SHA-256 hash, never plaintext.
//!
//! [`ExportHistoryRecord`]: crate::core::history::record::ExportHistoryRecord

use crate::domain::ids::{ConsentId, ExportId, ShareId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// How an export was delivered to a recipient
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ShareMethod {
    /// Expiring secure download link
    SecureLink,
    /// Encrypted email attachment
    Email,
    /// Direct handoff to a connected provider
    DirectToProvider,
}

/// What kind of party received the share
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecipientType {
    Clinician,
    Caregiver,
    Researcher,
    Personal,
}

/// Who a share went to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipientInfo {
    /// Display name of the recipient
    pub name: String,

    /// Kind of recipient
    pub recipient_type: RecipientType,

    /// Recipient's organization, when known
    pub organization: Option<String>,

    /// SHA-256 hash of the recipient's contact address
    pub contact_hash: String,
}

impl RecipientInfo {
    /// Create recipient info, hashing the contact address immediately
    pub fn new(
        name: impl Into<String>,
        recipient_type: RecipientType,
        contact: &str,
    ) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(contact.as_bytes());
        let hash = hasher.finalize();
        Self {
            name: name.into(),
            recipient_type,
            organization: None,
            contact_hash: format!("{hash:x}"),
        }
    }

    /// Attach the recipient's organization
    pub fn with_organization(mut self, organization: impl Into<String>) -> Self {
        self.organization = Some(organization.into());
        self
    }
}

/// What a recipient may do with a shared export
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AccessPermissions {
    pub can_view: bool,
    pub can_download: bool,
    pub can_print: bool,
    pub can_reshare: bool,

    /// Cap on total accesses, when set
    pub max_access_count: Option<u32>,
}

impl Default for AccessPermissions {
    fn default() -> Self {
        Self {
            can_view: true,
            can_download: true,
            can_print: false,
            can_reshare: false,
            max_access_count: None,
        }
    }
}

/// Lifecycle status of a share
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SharingStatus {
    /// Created, not yet delivered
    Pending,
    /// Delivered to the recipient
    Delivered,
    /// Recipient opened the export
    Accessed,
    /// Recipient downloaded the payload
    Downloaded,
    /// Share lapsed before or after delivery
    Expired,
    /// Share withdrawn by the user
    Revoked,
}

impl SharingStatus {
    /// Whether the share can still advance
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Expired | Self::Revoked)
    }
}

/// Kind of recipient access event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ShareAccessKind {
    Delivered,
    Viewed,
    Downloaded,
    Printed,
}

/// One entry in a share's access log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareAccessEvent {
    /// When the access happened
    pub timestamp: DateTime<Utc>,

    /// What kind of access it was
    pub kind: ShareAccessKind,

    /// Free-text detail
    pub details: String,
}

/// One share action against an export
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharingHistoryRecord {
    /// Share identifier
    pub id: ShareId,

    /// Parent export history record
    pub export_history_id: ExportId,

    /// Who received the share
    pub recipient: RecipientInfo,

    /// How it was delivered
    pub method: ShareMethod,

    /// Consent record authorizing the share
    pub consent_id: ConsentId,

    /// What the recipient may do
    pub permissions: AccessPermissions,

    /// When the share lapses
    pub expires_at: DateTime<Utc>,

    /// Lifecycle status
    pub status: SharingStatus,

    /// Append-only access log
    pub access_log: Vec<ShareAccessEvent>,

    /// When the share was created
    pub created_at: DateTime<Utc>,
}

impl SharingHistoryRecord {
    /// Create a pending share
    pub fn new(
        export_history_id: ExportId,
        recipient: RecipientInfo,
        method: ShareMethod,
        consent_id: ConsentId,
        permissions: AccessPermissions,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ShareId::generate(),
            export_history_id,
            recipient,
            method,
            consent_id,
            permissions,
            expires_at,
            status: SharingStatus::Pending,
            access_log: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Record an access event, advancing the status
    ///
    /// Terminal shares (expired/revoked) log nothing and return `false`.
    /// Access caps flip the share to expired once exhausted.
    pub fn record_access(&mut self, kind: ShareAccessKind, details: impl Into<String>) -> bool {
        if self.status.is_terminal() {
            return false;
        }

        self.access_log.push(ShareAccessEvent {
            timestamp: Utc::now(),
            kind,
            details: details.into(),
        });

        self.status = match kind {
            ShareAccessKind::Delivered => SharingStatus::Delivered,
            ShareAccessKind::Viewed => SharingStatus::Accessed,
            ShareAccessKind::Downloaded => SharingStatus::Downloaded,
            // A print does not advance the delivery lifecycle
            ShareAccessKind::Printed => self.status,
        };

        if let Some(cap) = self.permissions.max_access_count {
            if self.access_log.len() as u32 >= cap {
                self.status = SharingStatus::Expired;
            }
        }

        true
    }

    /// Withdraw the share
    pub fn revoke(&mut self) {
        self.status = SharingStatus::Revoked;
    }

    /// Whether the share has lapsed as of `now`
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at || self.status == SharingStatus::Expired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn share() -> SharingHistoryRecord {
        SharingHistoryRecord::new(
            ExportId::new("exp-1").unwrap(),
            RecipientInfo::new("Dr. Chen", RecipientType::Clinician, "chen@clinic.example"),
            ShareMethod::SecureLink,
            ConsentId::generate(),
            AccessPermissions::default(),
            Utc::now() + Duration::days(7),
        )
    }

    #[test]
    fn test_contact_is_hashed() {
        let recipient = RecipientInfo::new("Dr. Chen", RecipientType::Clinician, "chen@clinic.example");
        assert_eq!(recipient.contact_hash.len(), 64);
        assert!(!recipient.contact_hash.contains("chen"));
    }

    #[test]
    fn test_access_advances_status() {
        let mut record = share();
        assert_eq!(record.status, SharingStatus::Pending);

        assert!(record.record_access(ShareAccessKind::Delivered, "sent"));
        assert_eq!(record.status, SharingStatus::Delivered);

        assert!(record.record_access(ShareAccessKind::Viewed, "opened"));
        assert_eq!(record.status, SharingStatus::Accessed);

        assert!(record.record_access(ShareAccessKind::Downloaded, "saved"));
        assert_eq!(record.status, SharingStatus::Downloaded);

        assert_eq!(record.access_log.len(), 3);
    }

    #[test]
    fn test_print_does_not_advance_status() {
        let mut record = share();
        record.record_access(ShareAccessKind::Delivered, "sent");
        record.record_access(ShareAccessKind::Printed, "printed");
        assert_eq!(record.status, SharingStatus::Delivered);
    }

    #[test]
    fn test_terminal_share_rejects_access() {
        let mut record = share();
        record.revoke();
        assert!(!record.record_access(ShareAccessKind::Viewed, "opened"));
        assert!(record.access_log.is_empty());
    }

    #[test]
    fn test_access_cap_expires_share() {
        let mut record = share();
        record.permissions.max_access_count = Some(2);

        record.record_access(ShareAccessKind::Delivered, "sent");
        assert_eq!(record.status, SharingStatus::Delivered);

        record.record_access(ShareAccessKind::Viewed, "opened");
        assert_eq!(record.status, SharingStatus::Expired);

        assert!(!record.record_access(ShareAccessKind::Viewed, "again"));
    }

    #[test]
    fn test_expiry_by_time() {
        let mut record = share();
        record.expires_at = Utc::now() - Duration::hours(1);
        assert!(record.is_expired(Utc::now()));
    }
}
