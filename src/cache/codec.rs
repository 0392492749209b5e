//! Entry Codec
//!
//! Pure (de)serialization of cache entries and persisted snapshots.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cache::CacheEntry;
use crate::error::Result;

/// Persisted snapshot: schema tag plus the live entries at flush time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// `cache_version` the snapshot was written under
    pub version: String,
    /// RFC 3339 time of the flush
    #[serde(default)]
    pub saved_at: String,
    pub entries: Vec<CacheEntry>,
}

impl Snapshot {
    /// Builds a snapshot stamped with the current time.
    pub fn new(version: impl Into<String>, entries: Vec<CacheEntry>) -> Self {
        Self {
            version: version.into(),
            saved_at: chrono::Utc::now().to_rfc3339(),
            entries,
        }
    }
}

/// Serializes a snapshot into the single blob stored under the namespace.
pub fn encode_snapshot(snapshot: &Snapshot) -> Result<String> {
    Ok(serde_json::to_string(snapshot)?)
}

/// Parses a stored blob back into a snapshot.
pub fn decode_snapshot(raw: &str) -> Result<Snapshot> {
    Ok(serde_json::from_str(raw)?)
}

/// Estimated size of a value once serialized, in bytes.
pub fn estimate_size(value: &Value) -> usize {
    // Serializing a Value cannot fail: every map key is a string.
    serde_json::to_vec(value).map(|bytes| bytes.len()).unwrap_or(0)
}
