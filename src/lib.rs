//! Synced Cache - client-side cache for JSON API responses
//!
//! TTL expiry, bounded eviction, request de-duplication, versioned writes,
//! group invalidation, snapshot persistence and push-driven reconciliation.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod persistence;
pub mod realtime;
pub mod tasks;
pub mod upstream;

pub use api::{create_router, AppState};
pub use cache::{ResponseCache, SetOptions, SetOutcome};
pub use config::{CacheConfig, Config};
pub use error::{CacheError, Result};
pub use persistence::{FileStorage, KeyValueStorage, MemoryStorage, PersistenceSync};
pub use realtime::{ChangeEvent, ChannelTransport, ConnectionState, Operation, Reconciler, ResourceRoutes};
pub use tasks::{spawn_persist_task, spawn_reconcile_task, spawn_sweep_task};
pub use upstream::UpstreamClient;
