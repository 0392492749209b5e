//! Cache Module
//!
//! Provides a bounded JSON response cache with TTL expiration, size/item
//! eviction, group invalidation and request de-duplication.

pub mod codec;
mod entry;
mod eviction;
mod groups;
mod handle;
mod stats;
mod store;


// Re-export public types
pub use entry::{current_timestamp_ms, CacheEntry};
pub use eviction::EvictionPolicy;
pub use groups::{GroupInvalidator, UNGROUPED};
pub use handle::{ResponseCache, SetOptions};
pub use stats::CacheStats;
pub use store::{CacheStore, SetOutcome};

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;
