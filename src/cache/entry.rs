//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL and version metadata.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::Value;

// == Cache Entry ==
/// Represents a single cached JSON response with its metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    /// Key identifying the cached resource
    pub key: String,
    /// The stored response payload
    pub value: Value,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,
    /// Expiration timestamp (Unix milliseconds)
    pub expires_at: u64,
    /// Estimated serialized size in bytes
    pub size_bytes: usize,
    /// Monotonic write version for this key
    pub version: u64,
    /// Group derived from the key prefix at insertion
    pub group: String,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new entry expiring `ttl` from now.
    pub fn new(
        key: String,
        value: Value,
        ttl: Duration,
        size_bytes: usize,
        version: u64,
        group: String,
    ) -> Self {
        let now = current_timestamp_ms();
        Self {
            key,
            value,
            created_at: now,
            expires_at: now.saturating_add(ttl.as_millis() as u64),
            size_bytes,
            version,
            group,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is expired once the current time reaches `expires_at`.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(current_timestamp_ms())
    }

    /// Checks expiry against a fixed instant (Unix milliseconds).
    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        now_ms >= self.expires_at
    }

    // == Time To Live ==
    /// Returns remaining TTL in milliseconds, 0 once expired.
    pub fn ttl_remaining_ms(&self) -> u64 {
        self.expires_at.saturating_sub(current_timestamp_ms())
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::thread::sleep;

    fn entry_with_ttl(ttl: Duration) -> CacheEntry {
        CacheEntry::new(
            "api/blog/post/1".to_string(),
            json!({"id": 1}),
            ttl,
            8,
            1,
            "blog".to_string(),
        )
    }

    #[test]
    fn test_entry_creation() {
        let entry = entry_with_ttl(Duration::from_secs(60));

        assert_eq!(entry.value, json!({"id": 1}));
        assert_eq!(entry.expires_at - entry.created_at, 60_000);
        assert!(!entry.is_expired());
    }

    #[test]
    fn test_entry_expiration() {
        let entry = entry_with_ttl(Duration::from_millis(20));

        assert!(!entry.is_expired());
        sleep(Duration::from_millis(40));
        assert!(entry.is_expired());
        assert_eq!(entry.ttl_remaining_ms(), 0);
    }

    #[test]
    fn test_ttl_remaining_ms() {
        let entry = entry_with_ttl(Duration::from_secs(10));

        let remaining_ms = entry.ttl_remaining_ms();
        assert!(remaining_ms <= 10_000);
        assert!(remaining_ms >= 9_000);
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let entry = entry_with_ttl(Duration::ZERO);

        assert_eq!(entry.expires_at, entry.created_at);
        assert!(entry.is_expired(), "Entry should be expired at boundary");
        assert!(entry.is_expired_at(entry.expires_at));
        assert!(!entry.is_expired_at(entry.expires_at - 1));
    }

    #[test]
    fn test_entry_serializes_camel_case() {
        let entry = entry_with_ttl(Duration::from_secs(1));
        let json = serde_json::to_value(&entry).unwrap();

        assert!(json.get("createdAt").is_some());
        assert!(json.get("expiresAt").is_some());
        assert!(json.get("sizeBytes").is_some());
        assert_eq!(json["group"], "blog");
    }
}
