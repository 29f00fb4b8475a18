//! File-backed snapshot store
//!
//! Persists each snapshot as a JSON file under a state directory. Writes go
//! through a temporary file followed by a rename so a crash mid-write never
//! leaves a truncated snapshot behind.

use crate::adapters::storage::traits::SnapshotStore;
use crate::domain::{BeingError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Snapshot store backed by JSON files in a directory
pub struct FileSnapshotStore {
    root: PathBuf,
}

impl FileSnapshotStore {
    /// Create a store rooted at the given directory, creating it if needed
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root).map_err(|e| {
            BeingError::Storage(format!(
                "Failed to create state directory {}: {}",
                root.display(),
                e
            ))
        })?;
        Ok(Self { root })
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        // Keys become file names; reject anything that could escape the root
        if key.is_empty() || key.contains('/') || key.contains("..") {
            return Err(BeingError::Storage(format!("Invalid snapshot key: {key}")));
        }
        Ok(self.root.join(format!("{key}.json")))
    }
}

#[async_trait]
impl SnapshotStore for FileSnapshotStore {
    async fn save(&self, key: &str, snapshot: &Value) -> Result<()> {
        let path = self.path_for(key)?;
        let tmp_path = self.root.join(format!("{key}.json.tmp"));

        let bytes = serde_json::to_vec_pretty(snapshot)?;
        tokio::fs::write(&tmp_path, &bytes).await.map_err(|e| {
            BeingError::Storage(format!("Failed to write {}: {}", tmp_path.display(), e))
        })?;
        tokio::fs::rename(&tmp_path, &path).await.map_err(|e| {
            BeingError::Storage(format!("Failed to commit {}: {}", path.display(), e))
        })?;

        tracing::debug!(key = key, bytes = bytes.len(), "Snapshot saved");
        Ok(())
    }

    async fn load(&self, key: &str) -> Result<Option<Value>> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let value = serde_json::from_slice(&bytes)?;
                Ok(Some(value))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(BeingError::Storage(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(BeingError::Storage(format!(
                "Failed to delete {}: {}",
                path.display(),
                e
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_save_and_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = FileSnapshotStore::new(dir.path()).unwrap();

        let snapshot = json!({"version": 1, "items": [1, 2, 3]});
        store.save("test-key", &snapshot).await.unwrap();

        let loaded = store.load("test-key").await.unwrap();
        assert_eq!(loaded, Some(snapshot));
    }

    #[tokio::test]
    async fn test_load_missing_returns_none() {
        let dir = TempDir::new().unwrap();
        let store = FileSnapshotStore::new(dir.path()).unwrap();

        assert_eq!(store.load("absent").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_save_overwrites_previous() {
        let dir = TempDir::new().unwrap();
        let store = FileSnapshotStore::new(dir.path()).unwrap();

        store.save("k", &json!({"v": 1})).await.unwrap();
        store.save("k", &json!({"v": 2})).await.unwrap();

        let loaded = store.load("k").await.unwrap().unwrap();
        assert_eq!(loaded["v"], 2);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = FileSnapshotStore::new(dir.path()).unwrap();

        store.save("k", &json!({})).await.unwrap();
        store.delete("k").await.unwrap();
        store.delete("k").await.unwrap();
        assert_eq!(store.load("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_invalid_key_rejected() {
        let dir = TempDir::new().unwrap();
        let store = FileSnapshotStore::new(dir.path()).unwrap();

        assert!(store.save("../escape", &json!({})).await.is_err());
        assert!(store.load("a/b").await.is_err());
    }
}
