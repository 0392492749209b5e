//! Persistence Synchronizer
//!
//! Best-effort snapshotting of the cache to durable storage. Nothing here
//! ever returns an error to a cache caller: failures are logged and the cycle
//! is treated as if persistence were off.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::cache::codec::{decode_snapshot, encode_snapshot, Snapshot};
use crate::cache::{current_timestamp_ms, ResponseCache};
use crate::persistence::KeyValueStorage;

/// Storage namespace holding the snapshot blob.
pub const SNAPSHOT_NAMESPACE: &str = "synced_cache.snapshot";

/// Result of a flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Disabled,
    /// Snapshot written with this many entries
    Written(usize),
    /// Write failed; logged and ignored
    Failed,
}

/// Result of a startup load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Disabled,
    /// No snapshot stored
    Empty,
    /// Entries restored into the cache
    Loaded(usize),
    /// Snapshot written under another `cache_version`; discarded
    VersionMismatch,
    /// Snapshot unreadable; discarded
    Failed,
}

// == Persistence Sync ==
pub struct PersistenceSync {
    storage: Arc<dyn KeyValueStorage>,
    cache_version: String,
    enabled: bool,
}

impl PersistenceSync {
    pub fn new(storage: Arc<dyn KeyValueStorage>, cache_version: impl Into<String>, enabled: bool) -> Self {
        Self {
            storage,
            cache_version: cache_version.into(),
            enabled,
        }
    }

    /// Synchronizer configured from the cache's own options.
    pub fn for_cache(storage: Arc<dyn KeyValueStorage>, cache: &ResponseCache) -> Self {
        let config = cache.config();
        Self::new(storage, config.cache_version.clone(), config.persistence_enabled)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    // == Flush ==
    /// Writes every non-expired entry as one snapshot.
    pub async fn flush(&self, cache: &ResponseCache) -> SyncOutcome {
        if !self.enabled {
            return SyncOutcome::Disabled;
        }

        let entries = cache.live_entries().await;
        let count = entries.len();
        let snapshot = Snapshot::new(self.cache_version.clone(), entries);

        let raw = match encode_snapshot(&snapshot) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(error = %err, "Failed to encode cache snapshot");
                return SyncOutcome::Failed;
            }
        };

        match self.storage.set_item(SNAPSHOT_NAMESPACE, raw).await {
            Ok(()) => {
                debug!(entries = count, "Cache snapshot written");
                SyncOutcome::Written(count)
            }
            Err(err) => {
                warn!(error = %err, entries = count, "Failed to write cache snapshot");
                SyncOutcome::Failed
            }
        }
    }

    // == Load ==
    /// Restores the stored snapshot into `cache`.
    ///
    /// A snapshot from another `cache_version`, or one that cannot be parsed,
    /// is deleted whole rather than partially loaded.
    pub async fn load(&self, cache: &ResponseCache) -> LoadOutcome {
        if !self.enabled {
            return LoadOutcome::Disabled;
        }

        let raw = match self.storage.get_item(SNAPSHOT_NAMESPACE).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return LoadOutcome::Empty,
            Err(err) => {
                warn!(error = %err, "Failed to read cache snapshot");
                return LoadOutcome::Failed;
            }
        };

        let snapshot = match decode_snapshot(&raw) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(error = %err, "Discarding unreadable cache snapshot");
                self.discard().await;
                return LoadOutcome::Failed;
            }
        };

        if snapshot.version != self.cache_version {
            info!(
                stored = %snapshot.version,
                current = %self.cache_version,
                "Discarding cache snapshot from another schema version"
            );
            self.discard().await;
            return LoadOutcome::VersionMismatch;
        }

        let now = current_timestamp_ms();
        let total = snapshot.entries.len();
        let live: Vec<_> = snapshot
            .entries
            .into_iter()
            .filter(|entry| !entry.is_expired_at(now))
            .collect();
        let loaded = cache.restore(live).await;

        info!(loaded, skipped = total - loaded, saved_at = %snapshot.saved_at, "Cache snapshot loaded");
        LoadOutcome::Loaded(loaded)
    }

    /// Deletes the stored snapshot. Failures are logged.
    pub async fn discard(&self) {
        if let Err(err) = self.storage.remove_item(SNAPSHOT_NAMESPACE).await {
            warn!(error = %err, "Failed to remove cache snapshot");
        }
    }
}
