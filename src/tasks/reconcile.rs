//! Reconciler Task
//!
//! Runs the reconciler against a transport on its own task until the
//! transport's stream ends.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::realtime::{EventTransport, Reconciler};

pub fn spawn_reconcile_task<T>(reconciler: Arc<Reconciler>, mut transport: T) -> JoinHandle<()>
where
    T: EventTransport + 'static,
{
    tokio::spawn(async move {
        match reconciler.run(&mut transport).await {
            Ok(applied) => info!(applied, "Reconciler stopped"),
            Err(err) => warn!(error = %err, "Reconciler could not start"),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{ResponseCache, SetOptions};
    use crate::config::CacheConfig;
    use crate::realtime::{ChangeEvent, ChannelTransport, ConnectionState, Operation, ResourceRoutes};
    use serde_json::json;
    use std::time::Duration;

    #[tokio::test]
    async fn test_reconcile_task_applies_events() {
        let cache = ResponseCache::new(CacheConfig::default());
        cache.set("api/blog/post/5", json!("body"), SetOptions::default()).await.unwrap();
        cache.set("api/blog/all", json!(["5"]), SetOptions::default()).await.unwrap();

        let reconciler = Arc::new(Reconciler::new(cache.clone(), ResourceRoutes::standard()));
        let (publisher, transport) = ChannelTransport::new(8);
        let handle = spawn_reconcile_task(reconciler.clone(), transport);

        publisher
            .publish(ChangeEvent::new("post", "5", Operation::Deleted))
            .await
            .unwrap();
        drop(publisher);

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();

        assert!(cache.is_empty().await);
        assert_eq!(reconciler.state(), ConnectionState::Disconnected);
    }
}
