//! Realtime Reconciler
//!
//! Applies pushed change events to the cache, one at a time and in delivery
//! order, so cached responses do not outlive server-side mutations.

use std::mem::discriminant;

use futures::StreamExt;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::cache::{ResponseCache, SetOptions, SetOutcome};
use crate::error::Result;
use crate::realtime::{ChangeEvent, EventTransport, Operation, ResourceRoutes};

/// Connection lifecycle as seen by the reconciler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Effect one event had on the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    /// Resource key dropped, plus this many collection keys
    Invalidated { key: String, collections: usize },
    /// Pushed payload written directly under its version
    Updated { key: String, version: u64 },
}

// == Reconciler ==
pub struct Reconciler {
    cache: ResponseCache,
    routes: ResourceRoutes,
    optimistic_updates: bool,
    state: watch::Sender<ConnectionState>,
}

impl Reconciler {
    pub fn new(cache: ResponseCache, routes: ResourceRoutes) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            cache,
            routes,
            optimistic_updates: false,
            state,
        }
    }

    /// Allow `updated` events to write their payload instead of invalidating.
    #[must_use]
    pub fn with_optimistic_updates(mut self, enabled: bool) -> Self {
        self.optimistic_updates = enabled;
        self
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Receiver notified on every connection state change.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    // == Run ==
    /// Connects through `transport` and applies events until the stream ends.
    ///
    /// Returns the number of events applied. Each event is fully applied
    /// before the next one is read.
    pub async fn run<T>(&self, transport: &mut T) -> Result<usize>
    where
        T: EventTransport + ?Sized,
    {
        self.state.send_replace(ConnectionState::Connecting);
        let mut events = match transport.connect().await {
            Ok(events) => events,
            Err(err) => {
                self.state.send_replace(ConnectionState::Disconnected);
                warn!(error = %err, "Push transport failed to connect");
                return Err(err);
            }
        };
        self.state.send_replace(ConnectionState::Connected);
        info!("Push transport connected");

        let mut applied = 0;
        while let Some(event) = events.next().await {
            let outcome = self.apply(&event).await;
            debug!(%event, ?outcome, "Change event applied");
            applied += 1;
        }

        self.state.send_replace(ConnectionState::Disconnected);
        info!(applied, "Push transport closed");
        Ok(applied)
    }

    // == Apply ==
    /// Applies one event.
    ///
    /// Invalidation is the default for every operation. Creates and deletes
    /// also drop the resource type's collection keys.
    pub async fn apply(&self, event: &ChangeEvent) -> Reconciliation {
        let key = self.routes.key_for(event);

        if event.operation == Operation::Updated && self.optimistic_updates {
            if let Some(version) = self.try_optimistic(&key, event).await {
                return Reconciliation::Updated { key, version };
            }
        }

        self.cache.invalidate(&key).await;

        let mut collections = 0;
        if matches!(event.operation, Operation::Created | Operation::Deleted) {
            for collection_key in self.routes.collection_keys(&event.resource_type) {
                if self.cache.invalidate(collection_key).await {
                    collections += 1;
                }
            }
        }

        Reconciliation::Invalidated { key, collections }
    }

    /// Writes the pushed payload when it is a newer version of the same shape.
    async fn try_optimistic(&self, key: &str, event: &ChangeEvent) -> Option<u64> {
        let (payload, version) = (event.payload.as_ref()?, event.version?);
        let cached = self.cache.entry(key).await?;

        if version <= cached.version || !same_shape(&cached.value, payload) {
            return None;
        }

        match self
            .cache
            .set(key, payload.clone(), SetOptions::default().version(version))
            .await
        {
            Ok(SetOutcome::Stored { version }) => Some(version),
            _ => None,
        }
    }
}

/// Same JSON kind; objects must also have identical key sets.
fn same_shape(cached: &Value, pushed: &Value) -> bool {
    match (cached, pushed) {
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len() && a.keys().all(|k| b.contains_key(k))
        }
        _ => discriminant(cached) == discriminant(pushed),
    }
}
