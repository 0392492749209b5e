//! Durable key-value storage used for cache snapshots.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::{CacheError, Result};

/// Minimal durable key-value store holding one blob per namespace.
#[async_trait]
pub trait KeyValueStorage: Send + Sync {
    /// Reads the blob stored under `namespace`, if any.
    async fn get_item(&self, namespace: &str) -> Result<Option<String>>;

    /// Replaces the blob stored under `namespace`.
    async fn set_item(&self, namespace: &str, value: String) -> Result<()>;

    /// Deletes the blob stored under `namespace`; missing blobs are fine.
    async fn remove_item(&self, namespace: &str) -> Result<()>;
}

// == Memory Storage ==
/// In-process storage, optionally limited to a byte quota.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
    quota: Option<usize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage that refuses writes once the stored bytes would exceed `quota`.
    pub fn with_quota(quota: usize) -> Self {
        Self {
            items: Mutex::default(),
            quota: Some(quota),
        }
    }
}

#[async_trait]
impl KeyValueStorage for MemoryStorage {
    async fn get_item(&self, namespace: &str) -> Result<Option<String>> {
        Ok(self.items.lock().await.get(namespace).cloned())
    }

    async fn set_item(&self, namespace: &str, value: String) -> Result<()> {
        let mut items = self.items.lock().await;
        if let Some(quota) = self.quota {
            let others: usize = items
                .iter()
                .filter(|(ns, _)| ns.as_str() != namespace)
                .map(|(_, v)| v.len())
                .sum();
            if others + value.len() > quota {
                return Err(CacheError::Persistence(format!(
                    "storage quota of {} bytes exceeded",
                    quota
                )));
            }
        }
        items.insert(namespace.to_string(), value);
        Ok(())
    }

    async fn remove_item(&self, namespace: &str) -> Result<()> {
        self.items.lock().await.remove(namespace);
        Ok(())
    }
}

// == File Storage ==
/// One file per namespace inside a directory.
///
/// Writes go to a temporary sibling first and are renamed into place, so a
/// crash mid-write leaves the previous snapshot intact.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, namespace: &str) -> PathBuf {
        let file_name: String = namespace
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{file_name}.json"))
    }
}

#[async_trait]
impl KeyValueStorage for FileStorage {
    async fn get_item(&self, namespace: &str) -> Result<Option<String>> {
        match tokio::fs::read_to_string(self.path_for(namespace)).await {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn set_item(&self, namespace: &str, value: String) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(namespace);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, value).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn remove_item(&self, namespace: &str) -> Result<()> {
        match tokio::fs::remove_file(self.path_for(namespace)).await {
            Err(err) if err.kind() != std::io::ErrorKind::NotFound => Err(err.into()),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_storage_roundtrip() {
        let storage = MemoryStorage::new();

        assert_eq!(storage.get_item("ns").await.unwrap(), None);
        storage.set_item("ns", "blob".to_string()).await.unwrap();
        assert_eq!(storage.get_item("ns").await.unwrap(), Some("blob".to_string()));
        storage.remove_item("ns").await.unwrap();
        assert_eq!(storage.get_item("ns").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_memory_storage_quota() {
        let storage = MemoryStorage::with_quota(4);

        storage.set_item("ns", "1234".to_string()).await.unwrap();
        // Replacing the same namespace does not count the old blob.
        storage.set_item("ns", "abcd".to_string()).await.unwrap();

        let result = storage.set_item("other", "x".to_string()).await;
        assert!(matches!(result, Err(CacheError::Persistence(_))));
        assert_eq!(storage.get_item("other").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_file_storage_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("nested"));

        assert_eq!(storage.get_item("synced_cache.snapshot").await.unwrap(), None);
        storage
            .set_item("synced_cache.snapshot", "{}".to_string())
            .await
            .unwrap();
        assert_eq!(
            storage.get_item("synced_cache.snapshot").await.unwrap(),
            Some("{}".to_string())
        );

        storage.remove_item("synced_cache.snapshot").await.unwrap();
        storage.remove_item("synced_cache.snapshot").await.unwrap();
        assert_eq!(storage.get_item("synced_cache.snapshot").await.unwrap(), None);
    }

    #[test]
    fn test_file_storage_sanitizes_namespace() {
        let storage = FileStorage::new("/tmp/cache");
        assert_eq!(
            storage.path_for("../evil/ns"),
            PathBuf::from("/tmp/cache/.._evil_ns.json")
        );
    }
}
