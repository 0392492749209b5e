//! Cache Store Module
//!
//! Synchronous cache engine: keyed entries, TTL bookkeeping, size accounting,
//! version guarding and the in-flight fetch registry used for eviction pinning.

use std::collections::HashMap;
use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use crate::cache::codec::estimate_size;
use crate::cache::entry::current_timestamp_ms;
use crate::cache::{CacheEntry, CacheStats, EvictionPolicy, GroupInvalidator};
use crate::config::CacheConfig;

// == Set Outcome ==
/// Result of a write against the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOutcome {
    /// Value stored under the given version
    Stored { version: u64 },
    /// Supplied version was not newer than the stored one
    StaleRejected { current: u64 },
    /// Value alone exceeds `max_size`; returned to the caller uncached
    TooLarge { size_bytes: usize },
    /// The fetch was overtaken by an invalidation or a newer write
    Superseded,
}

/// Bookkeeping for a key whose fetch is in flight.
///
/// `id` tells a settling fetch apart from a newer one started for the same
/// key after the first was superseded.
#[derive(Debug)]
struct FlightTicket {
    id: u64,
    superseded: bool,
}

// == Cache Store ==
/// Single owner of live entries. Every removal goes through `remove_entry`.
#[derive(Debug)]
pub struct CacheStore {
    /// Key-value storage
    entries: HashMap<String, CacheEntry>,
    /// Keys with a fetch in flight
    in_flight: HashMap<String, FlightTicket>,
    /// Last fetch id handed out
    last_flight_id: u64,
    policy: EvictionPolicy,
    groups: GroupInvalidator,
    default_ttl: Duration,
    /// Per-prefix TTLs, longest prefix first
    prefix_ttl: Vec<(String, Duration)>,
    group_ttl: HashMap<String, Duration>,
    /// Summed `size_bytes` of stored entries
    total_size: usize,
    stats: CacheStats,
}

impl CacheStore {
    // == Constructor ==
    /// Creates an empty store governed by `config`.
    pub fn new(config: &CacheConfig) -> Self {
        let mut prefix_ttl: Vec<(String, Duration)> = config
            .prefix_ttl
            .iter()
            .map(|(prefix, ttl)| (prefix.clone(), *ttl))
            .collect();
        prefix_ttl.sort_by(|(a, _), (b, _)| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

        Self {
            entries: HashMap::new(),
            in_flight: HashMap::new(),
            last_flight_id: 0,
            policy: EvictionPolicy::new(config.max_items, config.max_size),
            groups: GroupInvalidator::new(config.groups.clone()),
            default_ttl: config.default_ttl,
            prefix_ttl,
            group_ttl: config.group_ttl.clone(),
            total_size: 0,
            stats: CacheStats::new(),
        }
    }

    // == TTL Resolution ==
    /// Resolves the TTL for `key`: override, then longest prefix, then group, then default.
    pub fn resolve_ttl(&self, key: &str, ttl_override: Option<Duration>) -> Duration {
        if let Some(ttl) = ttl_override {
            return ttl;
        }
        if let Some((_, ttl)) = self
            .prefix_ttl
            .iter()
            .find(|(prefix, _)| key.starts_with(prefix.as_str()))
        {
            return *ttl;
        }
        self.group_ttl
            .get(&self.groups.group_for_key(key))
            .copied()
            .unwrap_or(self.default_ttl)
    }

    // == Lookup ==
    /// Returns the value if a fresh entry exists, recording a hit or a miss.
    ///
    /// An expired entry found here is removed.
    pub fn lookup(&mut self, key: &str) -> Option<Value> {
        match self.entries.get(key) {
            Some(entry) if !entry.is_expired() => {
                let value = entry.value.clone();
                self.stats.record_hit();
                Some(value)
            }
            Some(_) => {
                self.remove_entry(key);
                self.stats.record_miss();
                None
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    /// Returns the fresh entry for `key` without touching statistics.
    pub fn peek(&self, key: &str) -> Option<&CacheEntry> {
        self.entries.get(key).filter(|entry| !entry.is_expired())
    }

    // == In-Flight Registry ==
    /// Registers a fetch for `key`; the key is pinned against eviction until it settles.
    ///
    /// Returns the fetch id to settle it with. A superseded fetch still
    /// running for `key` is replaced and its result will be discarded.
    pub fn begin_fetch(&mut self, key: &str) -> u64 {
        self.last_flight_id += 1;
        let id = self.last_flight_id;
        self.in_flight.insert(
            key.to_string(),
            FlightTicket {
                id,
                superseded: false,
            },
        );
        self.stats.record_fetch();
        id
    }

    /// Whether a fetch for `key` is in flight.
    pub fn is_in_flight(&self, key: &str) -> bool {
        self.in_flight.contains_key(key)
    }

    /// Id of the fetch for `key` whose result would still be stored.
    pub fn live_flight(&self, key: &str) -> Option<u64> {
        self.in_flight
            .get(key)
            .filter(|ticket| !ticket.superseded)
            .map(|ticket| ticket.id)
    }

    /// Stores a successful fetch result unless the fetch was superseded.
    pub fn complete_fetch(
        &mut self,
        key: &str,
        flight_id: u64,
        value: Value,
        ttl_override: Option<Duration>,
    ) -> SetOutcome {
        match self.take_ticket(key, flight_id) {
            Some(ticket) if !ticket.superseded => self.write(key, value, None, ttl_override),
            _ => {
                debug!(key, flight_id, "Discarding late fetch response for superseded key");
                self.enforce_bounds();
                SetOutcome::Superseded
            }
        }
    }

    /// Releases a failed fetch. Any existing entry is left untouched.
    pub fn abandon_fetch(&mut self, key: &str, flight_id: u64) {
        self.take_ticket(key, flight_id);
        self.enforce_bounds();
    }

    // == Write ==
    /// Stores `value` under `key`.
    ///
    /// With a supplied `version`, the write is rejected unless it is newer
    /// than the stored version. Without one, the stored version is bumped.
    pub fn write(
        &mut self,
        key: &str,
        value: Value,
        version: Option<u64>,
        ttl_override: Option<Duration>,
    ) -> SetOutcome {
        self.sweep_expired();

        let current = self.entries.get(key).map(|entry| entry.version);
        if let (Some(supplied), Some(current)) = (version, current) {
            if supplied <= current {
                self.stats.record_stale_write();
                debug!(key, supplied, current, "Rejected stale write");
                return SetOutcome::StaleRejected { current };
            }
        }

        let size_bytes = estimate_size(&value);
        if !self.policy.admits(size_bytes) {
            // An older value must not stay readable after a newer write.
            self.remove_entry(key);
            self.supersede(key);
            self.stats.record_oversize();
            debug!(key, size_bytes, max_size = self.policy.max_size(), "Value too large to cache");
            return SetOutcome::TooLarge { size_bytes };
        }

        let version = version.unwrap_or_else(|| current.map_or(1, |v| v + 1));
        self.supersede(key);

        let entry = CacheEntry::new(
            key.to_string(),
            value,
            self.resolve_ttl(key, ttl_override),
            size_bytes,
            version,
            self.groups.group_for_key(key),
        );
        self.insert_entry(entry);
        self.enforce_bounds();

        SetOutcome::Stored { version }
    }

    // == Remove ==
    /// Removes the entry for `key`; an in-flight fetch for it will not be stored.
    ///
    /// Returns whether an entry was present.
    pub fn remove(&mut self, key: &str) -> bool {
        self.supersede(key);
        self.remove_entry(key).is_some()
    }

    /// Removes every entry covered by group `name`. Unknown groups remove nothing.
    pub fn remove_group(&mut self, name: &str) -> usize {
        for key in self.groups.resolve(name, self.in_flight.keys()) {
            self.supersede(&key);
        }

        let keys = self.groups.resolve(name, self.entries.keys());
        keys.iter().filter(|key| self.remove_entry(key).is_some()).count()
    }

    // == Sweep Expired ==
    /// Removes all expired entries from the cache.
    ///
    /// Returns the number of entries removed.
    pub fn sweep_expired(&mut self) -> usize {
        let now = current_timestamp_ms();
        let expired_keys: Vec<String> = self
            .entries
            .values()
            .filter(|entry| entry.is_expired_at(now))
            .map(|entry| entry.key.clone())
            .collect();

        for key in &expired_keys {
            self.remove_entry(key);
        }
        expired_keys.len()
    }

    // == Snapshot Support ==
    /// Clones every non-expired entry.
    pub fn live_entries(&self) -> Vec<CacheEntry> {
        let now = current_timestamp_ms();
        self.entries
            .values()
            .filter(|entry| !entry.is_expired_at(now))
            .cloned()
            .collect()
    }

    /// Loads a previously persisted entry.
    ///
    /// Expired, oversize, or not-newer-than-stored entries are dropped.
    /// Returns whether the entry is still held once bounds are enforced.
    pub fn restore(&mut self, mut entry: CacheEntry) -> bool {
        if entry.is_expired() || entry.expires_at < entry.created_at {
            return false;
        }
        if self
            .entries
            .get(&entry.key)
            .is_some_and(|current| current.version >= entry.version)
        {
            return false;
        }
        entry.size_bytes = estimate_size(&entry.value);
        if !self.policy.admits(entry.size_bytes) {
            return false;
        }

        let key = entry.key.clone();
        self.insert_entry(entry);
        self.enforce_bounds();
        self.entries.contains_key(&key)
    }

    /// Drops every entry and supersedes every in-flight fetch.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.total_size = 0;
        for ticket in self.in_flight.values_mut() {
            ticket.superseded = true;
        }
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_occupancy(self.entries.len(), self.total_size);
        stats
    }

    /// Counts a caller that joined an in-flight fetch.
    pub fn record_join(&mut self) {
        self.stats.record_join();
    }

    // == Length ==
    /// Returns the current number of entries in the cache.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Summed `size_bytes` of stored entries.
    pub fn total_size(&self) -> usize {
        self.total_size
    }

    /// The store's group resolver.
    pub fn groups(&self) -> &GroupInvalidator {
        &self.groups
    }

    // == Internals ==
    fn insert_entry(&mut self, entry: CacheEntry) {
        self.total_size += entry.size_bytes;
        if let Some(previous) = self.entries.insert(entry.key.clone(), entry) {
            self.total_size -= previous.size_bytes;
        }
    }

    fn remove_entry(&mut self, key: &str) -> Option<CacheEntry> {
        let removed = self.entries.remove(key)?;
        self.total_size -= removed.size_bytes;
        Some(removed)
    }

    /// Removes the ticket only if it belongs to fetch `flight_id`.
    fn take_ticket(&mut self, key: &str, flight_id: u64) -> Option<FlightTicket> {
        if self.in_flight.get(key).is_some_and(|ticket| ticket.id == flight_id) {
            self.in_flight.remove(key)
        } else {
            None
        }
    }

    fn supersede(&mut self, key: &str) {
        if let Some(ticket) = self.in_flight.get_mut(key) {
            ticket.superseded = true;
        }
    }

    fn enforce_bounds(&mut self) {
        let victims = self
            .policy
            .select_victims(self.entries.values(), |key| self.in_flight.contains_key(key));

        for key in victims {
            if self.remove_entry(&key).is_some() {
                self.stats.record_eviction();
                debug!(key = %key, "Evicted cache entry");
            }
        }

        if !self.policy.within_bounds(self.entries.len(), self.total_size) {
            debug!(
                entries = self.entries.len(),
                total_size = self.total_size,
                "Eviction deferred until in-flight fetches settle"
            );
        }
    }
}
