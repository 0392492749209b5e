//! Expiry Sweep Task
//!
//! Periodically removes expired entries so they stop counting against the
//! capacity bounds before anyone reads them.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::ResponseCache;

/// Spawns the sweep loop. Abort the returned handle to stop it.
///
/// A zero interval starts no loop.
pub fn spawn_sweep_task(cache: ResponseCache, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        if interval.is_zero() {
            warn!("Sweep interval is zero; expired entries are dropped on access only");
            return;
        }
        info!(interval_ms = interval.as_millis() as u64, "Starting expiry sweep task");

        loop {
            tokio::time::sleep(interval).await;

            let removed = cache.sweep_expired().await;
            if removed > 0 {
                info!(removed, "Expiry sweep removed entries");
            } else {
                debug!("Expiry sweep found nothing to remove");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::SetOptions;
    use crate::config::CacheConfig;
    use serde_json::json;

    #[tokio::test]
    async fn test_sweep_task_removes_expired_entries() {
        let cache = ResponseCache::new(CacheConfig::default());
        cache
            .set("api/short", json!(1), SetOptions::default().ttl(Duration::from_millis(20)))
            .await
            .unwrap();

        let handle = spawn_sweep_task(cache.clone(), Duration::from_millis(50));
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(cache.len().await, 0);
        handle.abort();
    }

    #[tokio::test]
    async fn test_sweep_task_preserves_valid_entries() {
        let cache = ResponseCache::new(CacheConfig::default());
        cache
            .set("api/long", json!(1), SetOptions::default().ttl(Duration::from_secs(3600)))
            .await
            .unwrap();

        let handle = spawn_sweep_task(cache.clone(), Duration::from_millis(20));
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(cache.entry("api/long").await.is_some());
        handle.abort();
    }

    #[tokio::test]
    async fn test_sweep_task_can_be_aborted() {
        let cache = ResponseCache::new(CacheConfig::default());
        let handle = spawn_sweep_task(cache, Duration::from_secs(1));

        handle.abort();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }

    #[tokio::test]
    async fn test_sweep_task_exits_on_zero_interval() {
        let cache = ResponseCache::new(CacheConfig::default());
        cache
            .set("api/short", json!(1), SetOptions::default().ttl(Duration::from_millis(10)))
            .await
            .unwrap();

        let handle = spawn_sweep_task(cache.clone(), Duration::ZERO);
        let joined = tokio::time::timeout(Duration::from_secs(1), handle).await.unwrap();
        assert!(joined.is_ok(), "Task should finish without spinning");

        // Expired entries still disappear when read.
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(cache.entry("api/short").await.is_none());
    }
}
