//! Background Tasks Module
//!
//! Long-running tasks spawned next to the HTTP server.
//!
//! # Tasks
//! - Sweep: drops expired entries at `sweep_interval`
//! - Persist: snapshots the cache at `sync_interval`
//! - Reconcile: applies pushed change events as they arrive

mod persist;
mod reconcile;
mod sweep;

pub use persist::spawn_persist_task;
pub use reconcile::spawn_reconcile_task;
pub use sweep::spawn_sweep_task;
