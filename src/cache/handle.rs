//! Response Cache Handle
//!
//! Async, cloneable front of the cache store. Owns the pending-request
//! registry that lets concurrent callers for one key share a single fetch.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::cache::{CacheEntry, CacheStats, CacheStore, SetOutcome, MAX_KEY_LENGTH};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};

type FetchResult = std::result::Result<Value, Arc<anyhow::Error>>;
type PendingFetch = Shared<BoxFuture<'static, FetchResult>>;

// == Set Options ==
/// Optional parameters of a direct write.
#[derive(Debug, Clone, Copy, Default)]
pub struct SetOptions {
    /// Version carried by the write; must be newer than the stored one
    pub version: Option<u64>,
    /// TTL override for this write
    pub ttl: Option<Duration>,
}

impl SetOptions {
    #[must_use]
    pub fn version(mut self, version: u64) -> Self {
        self.version = Some(version);
        self
    }

    #[must_use]
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }
}

/// Store plus the fetches currently in flight, guarded together.
struct CacheState {
    store: CacheStore,
    /// Joinable fetches, tagged with the store's fetch id
    pending: HashMap<String, (u64, PendingFetch)>,
}

impl CacheState {
    /// Fetch a new caller for `key` may join: one whose result will be stored.
    fn joinable(&self, key: &str) -> Option<PendingFetch> {
        let (id, flight) = self.pending.get(key)?;
        (self.store.live_flight(key) == Some(*id)).then(|| flight.clone())
    }

    /// Forgets fetches the store has superseded, so later callers start afresh.
    fn prune_pending(&mut self) {
        let store = &self.store;
        self.pending
            .retain(|key, (id, _)| store.live_flight(key) == Some(*id));
    }
}

// == Response Cache ==
/// Shared handle to one cache instance.
///
/// Clones refer to the same store. The lock is never held across a fetch
/// or any other await, so operations on different keys never wait on each
/// other's network calls.
#[derive(Clone)]
pub struct ResponseCache {
    state: Arc<Mutex<CacheState>>,
    config: Arc<CacheConfig>,
}

impl ResponseCache {
    // == Constructor ==
    /// Creates an independent, empty cache.
    pub fn new(config: CacheConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(CacheState {
                store: CacheStore::new(&config),
                pending: HashMap::new(),
            })),
            config: Arc::new(config),
        }
    }

    /// Options this cache was created with.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    // == Get ==
    /// Returns the cached value for `key`, fetching it on a miss.
    ///
    /// A fresh entry is returned without calling `fetcher`. If a fetch for
    /// `key` is already running, this call joins it. Otherwise `fetcher` is
    /// invoked once on its own task; the result is stored for later callers
    /// even if every waiting caller has gone away. A failed fetch is reported
    /// to every joined caller and leaves the store as it was.
    pub async fn get<F, Fut>(
        &self,
        key: &str,
        fetcher: F,
        ttl_override: Option<Duration>,
    ) -> Result<Value>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        validate_key(key)?;

        let flight = {
            let mut state = self.state.lock().await;
            state.store.sweep_expired();

            if let Some(value) = state.store.lookup(key) {
                return Ok(value);
            }

            if let Some(flight) = state.joinable(key) {
                state.store.record_join();
                debug!(key, "Joining in-flight fetch");
                flight
            } else {
                let id = state.store.begin_fetch(key);
                let flight =
                    self.spawn_fetch(key.to_string(), id, fetcher(key.to_string()), ttl_override);
                state.pending.insert(key.to_string(), (id, flight.clone()));
                debug!(key, flight_id = id, "Started fetch");
                flight
            }
        };

        flight.await.map_err(|err| CacheError::Fetch {
            key: key.to_string(),
            message: format!("{err:#}"),
        })
    }

    /// Runs the fetch on its own task and settles the store when it finishes.
    fn spawn_fetch<Fut>(
        &self,
        key: String,
        flight_id: u64,
        fetch: Fut,
        ttl_override: Option<Duration>,
    ) -> PendingFetch
    where
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        let state = Arc::clone(&self.state);
        let handle = tokio::spawn(async move {
            let result = fetch.await.map_err(Arc::new);

            let mut guard = state.lock().await;
            if guard.pending.get(&key).is_some_and(|(id, _)| *id == flight_id) {
                guard.pending.remove(&key);
            }
            match &result {
                Ok(value) => {
                    let outcome =
                        guard.store.complete_fetch(&key, flight_id, value.clone(), ttl_override);
                    debug!(key = %key, ?outcome, "Fetch settled");
                }
                Err(err) => {
                    guard.store.abandon_fetch(&key, flight_id);
                    warn!(key = %key, error = %err, "Fetch failed; keeping previous cache state");
                }
            }
            result
        });

        async move {
            match handle.await {
                Ok(result) => result,
                Err(join_err) => Err(Arc::new(anyhow::anyhow!("fetch task failed: {join_err}"))),
            }
        }
        .boxed()
        .shared()
    }

    // == Set ==
    /// Writes `value` directly, e.g. an optimistic update.
    ///
    /// A supplied version that is not newer than the stored one makes this a
    /// no-op reported as [`SetOutcome::StaleRejected`].
    pub async fn set(&self, key: &str, value: Value, options: SetOptions) -> Result<SetOutcome> {
        validate_key(key)?;
        let mut state = self.state.lock().await;
        let outcome = state.store.write(key, value, options.version, options.ttl);
        state.prune_pending();
        Ok(outcome)
    }

    // == Invalidate ==
    /// Removes the entry for `key`; the next `get` fetches afresh, even while
    /// an older fetch for `key` is still running.
    pub async fn invalidate(&self, key: &str) -> bool {
        let mut state = self.state.lock().await;
        let removed = state.store.remove(key);
        state.prune_pending();
        debug!(key, removed, "Invalidated cache key");
        removed
    }

    /// Removes every entry covered by group `name`. Unknown groups are a no-op.
    pub async fn invalidate_group(&self, name: &str) -> usize {
        let mut state = self.state.lock().await;
        let removed = state.store.remove_group(name);
        state.prune_pending();
        info!(group = name, removed, "Invalidated cache group");
        removed
    }

    /// Removes all expired entries, returning how many were dropped.
    pub async fn sweep_expired(&self) -> usize {
        self.state.lock().await.store.sweep_expired()
    }

    // == Inspection ==
    /// Fresh entry for `key`, without affecting statistics.
    pub async fn entry(&self, key: &str) -> Option<CacheEntry> {
        self.state.lock().await.store.peek(key).cloned()
    }

    /// Copies of every non-expired entry.
    pub async fn live_entries(&self) -> Vec<CacheEntry> {
        self.state.lock().await.store.live_entries()
    }

    /// Loads persisted entries, returning how many are held once all are in.
    ///
    /// An entry evicted by a later one in the same batch is not counted.
    pub async fn restore(&self, entries: Vec<CacheEntry>) -> usize {
        let mut state = self.state.lock().await;
        let mut restored = Vec::new();
        for entry in entries {
            let key = entry.key.clone();
            if validate_key(&key).is_ok() && state.store.restore(entry) {
                restored.push(key);
            }
        }
        restored
            .iter()
            .filter(|key| state.store.peek(key).is_some())
            .count()
    }

    pub async fn stats(&self) -> CacheStats {
        self.state.lock().await.store.stats()
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.store.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.lock().await.store.is_empty()
    }

    /// Number of keys with a joinable fetch in flight.
    pub async fn pending_len(&self) -> usize {
        self.state.lock().await.pending.len()
    }

    // == Dispose ==
    /// Drops all entries. Fetches still in flight complete for the callers
    /// already waiting on them but are neither stored nor joined.
    pub async fn dispose(&self) {
        let mut state = self.state.lock().await;
        state.store.clear();
        let abandoned = state.pending.len();
        state.prune_pending();
        info!(abandoned, "Cache disposed");
    }
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(CacheError::InvalidKey("key cannot be empty".to_string()));
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(CacheError::InvalidKey(format!(
            "key exceeds maximum length of {} bytes",
            MAX_KEY_LENGTH
        )));
    }
    Ok(())
}
