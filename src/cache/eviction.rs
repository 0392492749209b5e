//! Eviction Policy Module
//!
//! Chooses which entries to drop when the store exceeds its item or size bounds.

use crate::cache::CacheEntry;

// == Eviction Policy ==
/// Keeps the store within `max_items` and `max_size`.
///
/// Victims are taken soonest-to-expire first, ties broken by oldest
/// creation time, then by key so the order is deterministic.
#[derive(Debug, Clone, Copy)]
pub struct EvictionPolicy {
    max_items: usize,
    max_size: usize,
}

impl EvictionPolicy {
    // == Constructor ==
    pub fn new(max_items: usize, max_size: usize) -> Self {
        Self { max_items, max_size }
    }

    /// Maximum number of entries.
    pub fn max_items(&self) -> usize {
        self.max_items
    }

    /// Maximum summed size in bytes.
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    // == Admission ==
    /// Whether an entry of `size_bytes` could ever be stored.
    pub fn admits(&self, size_bytes: usize) -> bool {
        size_bytes <= self.max_size && self.max_items > 0
    }

    /// Whether `count` entries totalling `total_size` bytes fit.
    pub fn within_bounds(&self, count: usize, total_size: usize) -> bool {
        count <= self.max_items && total_size <= self.max_size
    }

    // == Victim Selection ==
    /// Returns the keys to evict, in eviction order.
    ///
    /// Entries for which `is_pinned` returns true are never selected; if the
    /// bounds cannot be met without them the result is the best effort and
    /// the caller re-runs selection once those keys are released.
    pub fn select_victims<'a, I, P>(&self, entries: I, is_pinned: P) -> Vec<String>
    where
        I: IntoIterator<Item = &'a CacheEntry>,
        P: Fn(&str) -> bool,
    {
        let entries: Vec<&CacheEntry> = entries.into_iter().collect();
        let mut count = entries.len();
        let mut total_size: usize = entries.iter().map(|e| e.size_bytes).sum();

        if self.within_bounds(count, total_size) {
            return Vec::new();
        }

        let mut candidates: Vec<&CacheEntry> = entries
            .into_iter()
            .filter(|entry| !is_pinned(&entry.key))
            .collect();
        candidates.sort_by(|a, b| {
            a.expires_at
                .cmp(&b.expires_at)
                .then(a.created_at.cmp(&b.created_at))
                .then_with(|| a.key.cmp(&b.key))
        });

        let mut victims = Vec::new();
        for entry in candidates {
            if self.within_bounds(count, total_size) {
                break;
            }
            count -= 1;
            total_size -= entry.size_bytes;
            victims.push(entry.key.clone());
        }
        victims
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(key: &str, created_at: u64, expires_at: u64, size_bytes: usize) -> CacheEntry {
        CacheEntry {
            key: key.to_string(),
            value: json!(null),
            created_at,
            expires_at,
            size_bytes,
            version: 1,
            group: "ungrouped".to_string(),
        }
    }

    #[test]
    fn test_no_victims_within_bounds() {
        let policy = EvictionPolicy::new(2, 100);
        let entries = [entry("a", 0, 10, 10), entry("b", 0, 20, 10)];
        assert!(policy.select_victims(&entries, |_| false).is_empty());
    }

    #[test]
    fn test_soonest_expiry_evicted_first() {
        let policy = EvictionPolicy::new(2, 1000);
        let entries = [
            entry("a", 0, 10_000, 1),
            entry("b", 1, 100_000, 1),
            entry("c", 2, 50_000, 1),
        ];
        assert_eq!(policy.select_victims(&entries, |_| false), vec!["a"]);
    }

    #[test]
    fn test_tie_broken_by_oldest_creation() {
        let policy = EvictionPolicy::new(1, 1000);
        let entries = [entry("young", 5, 100, 1), entry("old", 1, 100, 1)];
        assert_eq!(policy.select_victims(&entries, |_| false), vec!["old"]);
    }

    #[test]
    fn test_size_bound_evicts_until_fit() {
        let policy = EvictionPolicy::new(10, 100);
        let entries = [
            entry("a", 0, 10, 40),
            entry("b", 0, 20, 40),
            entry("c", 0, 30, 40),
        ];
        assert_eq!(policy.select_victims(&entries, |_| false), vec!["a"]);

        let tight = EvictionPolicy::new(10, 50);
        assert_eq!(tight.select_victims(&entries, |_| false), vec!["a", "b"]);
    }

    #[test]
    fn test_pinned_entries_are_skipped() {
        let policy = EvictionPolicy::new(1, 1000);
        let entries = [entry("a", 0, 10, 1), entry("b", 0, 20, 1)];
        assert_eq!(policy.select_victims(&entries, |k| k == "a"), vec!["b"]);
        assert!(policy.select_victims(&entries, |_| true).is_empty());
    }

    #[test]
    fn test_admits() {
        let policy = EvictionPolicy::new(3, 64);
        assert!(policy.admits(64));
        assert!(!policy.admits(65));
        assert!(!EvictionPolicy::new(0, 64).admits(1));
    }
}
