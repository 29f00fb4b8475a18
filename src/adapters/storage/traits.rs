//! Snapshot storage abstraction
//!
//! Defines the trait that snapshot storage backends must implement. The
//! consent and history services persist versioned JSON snapshots through
//! this seam; swapping the backend never touches service code.

use crate::domain::Result;
use async_trait::async_trait;
use serde_json::Value;

/// Key-value store for versioned JSON snapshots
///
/// Keys are stable, versioned store names (e.g. `being-export-history`).
/// Values are whole-store snapshots serialized as JSON; partial updates are
/// not supported — callers always write the full snapshot.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Persist a snapshot under the given key, replacing any previous value
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be written.
    async fn save(&self, key: &str, snapshot: &Value) -> Result<()>;

    /// Load the snapshot stored under the given key
    ///
    /// # Returns
    ///
    /// `Ok(Some(value))` if a snapshot exists, `Ok(None)` if not.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot exists but cannot be read or parsed.
    async fn load(&self, key: &str) -> Result<Option<Value>>;

    /// Remove the snapshot stored under the given key, if any
    ///
    /// # Errors
    ///
    /// Returns an error if the removal fails for reasons other than absence.
    async fn delete(&self, key: &str) -> Result<()>;
}
