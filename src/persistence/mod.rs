//! Persistence Module
//!
//! Durable storage backends and the synchronizer that snapshots the cache.

mod storage;
mod sync;

pub use storage::{FileStorage, KeyValueStorage, MemoryStorage};
pub use sync::{LoadOutcome, PersistenceSync, SyncOutcome, SNAPSHOT_NAMESPACE};
