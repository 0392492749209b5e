//! Snapshot Task
//!
//! Flushes the cache to durable storage on a fixed interval. A disabled
//! synchronizer or a zero interval makes the task exit immediately.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::cache::ResponseCache;
use crate::persistence::{PersistenceSync, SyncOutcome};

pub fn spawn_persist_task(
    cache: ResponseCache,
    sync: Arc<PersistenceSync>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if !sync.is_enabled() {
            debug!("Persistence disabled; snapshot task not started");
            return;
        }
        if interval.is_zero() {
            warn!("Snapshot interval is zero; periodic snapshots disabled");
            return;
        }
        info!(interval_ms = interval.as_millis() as u64, "Starting snapshot task");

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick fires immediately; the cache was just loaded.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            if let SyncOutcome::Written(count) = sync.flush(&cache).await {
                debug!(count, "Periodic snapshot written");
            }
        }
    })
}
