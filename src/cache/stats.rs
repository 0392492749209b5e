//! Cache Statistics Module
//!
//! Tracks cache performance metrics including hits, misses, fetches and evictions.

use serde::Serialize;

// == Cache Stats ==
/// Tracks cache performance metrics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Number of reads served from a fresh entry
    pub hits: u64,
    /// Number of reads that found no fresh entry
    pub misses: u64,
    /// Number of underlying fetches started
    pub fetches: u64,
    /// Number of callers that joined an in-flight fetch
    pub joined: u64,
    /// Number of entries evicted under item or size pressure
    pub evictions: u64,
    /// Number of writes dropped by the stale-write guard
    pub stale_writes: u64,
    /// Number of values too large to ever be stored
    pub oversize_rejections: u64,
    /// Current number of entries in the cache
    pub total_entries: usize,
    /// Current summed entry size in bytes
    pub total_size: usize,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no reads have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_fetch(&mut self) {
        self.fetches += 1;
    }

    pub fn record_join(&mut self) {
        self.joined += 1;
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    pub fn record_stale_write(&mut self) {
        self.stale_writes += 1;
    }

    pub fn record_oversize(&mut self) {
        self.oversize_rejections += 1;
    }

    // == Update Occupancy ==
    /// Updates the entry count and summed size.
    pub fn set_occupancy(&mut self, count: usize, size: usize) {
        self.total_entries = count;
        self.total_size = size;
    }
}
