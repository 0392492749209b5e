//! Response DTOs for the sidecar API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;
use serde_json::Value;

use crate::cache::{CacheStats, SetOutcome};
use crate::realtime::ConnectionState;

/// Response body for a read-through GET
#[derive(Debug, Clone, Serialize)]
pub struct GetResponse {
    pub key: String,
    pub value: Value,
}

impl GetResponse {
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// Response body for a direct write (PUT /cache/*key)
#[derive(Debug, Clone, Serialize)]
pub struct SetResponse {
    pub key: String,
    /// Whether the value is now cached
    pub stored: bool,
    /// Stored version on success, current version on a stale rejection
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
    pub message: String,
}

impl SetResponse {
    pub fn from_outcome(key: impl Into<String>, outcome: SetOutcome) -> Self {
        let key = key.into();
        let (stored, version, message) = match outcome {
            SetOutcome::Stored { version } => {
                (true, Some(version), format!("Key '{key}' stored at version {version}"))
            }
            SetOutcome::StaleRejected { current } => (
                false,
                Some(current),
                format!("Key '{key}' already holds version {current}"),
            ),
            SetOutcome::TooLarge { size_bytes } => (
                false,
                None,
                format!("Value for '{key}' is {size_bytes} bytes, above the cache size limit"),
            ),
            SetOutcome::Superseded => (false, None, format!("Write to '{key}' was superseded")),
        };
        Self {
            key,
            stored,
            version,
            message,
        }
    }
}

/// Response body for DELETE /cache/*key
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    pub key: String,
    /// False when nothing was cached under `key`
    pub removed: bool,
}

impl DeleteResponse {
    pub fn new(key: impl Into<String>, removed: bool) -> Self {
        Self {
            key: key.into(),
            removed,
        }
    }
}

/// Response body for DELETE /groups/:name
#[derive(Debug, Clone, Serialize)]
pub struct GroupInvalidateResponse {
    pub group: String,
    pub removed: usize,
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub hits: u64,
    pub misses: u64,
    pub fetches: u64,
    /// Callers that joined a fetch already in flight
    pub joined: u64,
    pub evictions: u64,
    pub stale_writes: u64,
    pub oversize_rejections: u64,
    pub total_entries: usize,
    pub total_size: usize,
    pub pending_fetches: usize,
    pub hit_rate: f64,
    pub connection: ConnectionState,
}

impl StatsResponse {
    pub fn new(stats: &CacheStats, pending_fetches: usize, connection: ConnectionState) -> Self {
        Self {
            hits: stats.hits,
            misses: stats.misses,
            fetches: stats.fetches,
            joined: stats.joined,
            evictions: stats.evictions,
            stale_writes: stats.stale_writes,
            oversize_rejections: stats.oversize_rejections,
            total_entries: stats.total_entries,
            total_size: stats.total_size,
            pending_fetches,
            hit_rate: stats.hit_rate(),
            connection,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    /// Current timestamp in RFC 3339 format
    pub timestamp: String,
}

impl HealthResponse {
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Response body for POST /events
#[derive(Debug, Clone, Serialize)]
pub struct EventAccepted {
    pub accepted: bool,
    /// Human-readable summary such as `Deleted post/42`
    pub event: String,
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
