//! API Handlers
//!
//! HTTP request handlers for each sidecar endpoint.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::cache::{ResponseCache, SetOutcome};
use crate::error::{CacheError, Result};
use crate::models::{
    DeleteResponse, EventAccepted, GetResponse, GroupInvalidateResponse, HealthResponse,
    SetRequest, SetResponse, StatsResponse,
};
use crate::realtime::{ChangeEvent, EventPublisher, Reconciler};
use crate::upstream::UpstreamClient;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub cache: ResponseCache,
    /// Fills read-through misses
    pub upstream: UpstreamClient,
    /// Feeds the reconciler's transport
    pub events: EventPublisher,
    pub reconciler: Arc<Reconciler>,
}

impl AppState {
    pub fn new(
        cache: ResponseCache,
        upstream: UpstreamClient,
        events: EventPublisher,
        reconciler: Arc<Reconciler>,
    ) -> Self {
        Self {
            cache,
            upstream,
            events,
            reconciler,
        }
    }
}

/// Handler for GET /api/*path
///
/// Read-through: served from cache when fresh, otherwise fetched upstream
/// once no matter how many requests are waiting on the same key.
pub async fn fetch_handler(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<Json<GetResponse>> {
    let key = format!("api/{}", normalize_key(&path));
    let upstream = state.upstream.clone();
    let value = state.cache.get(&key, move |key| upstream.fetch(key), None).await?;

    Ok(Json(GetResponse::new(key, value)))
}

/// Handler for PUT /cache/*key
///
/// Stale versions answer 409 and oversized values 413; neither changes the cache.
pub async fn set_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(req): Json<SetRequest>,
) -> Result<(StatusCode, Json<SetResponse>)> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let key = normalize_key(&key);
    let options = req.options();
    let outcome = state.cache.set(&key, req.value, options).await?;
    let status = match outcome {
        SetOutcome::Stored { .. } => StatusCode::OK,
        SetOutcome::StaleRejected { .. } | SetOutcome::Superseded => StatusCode::CONFLICT,
        SetOutcome::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
    };

    Ok((status, Json(SetResponse::from_outcome(key, outcome))))
}

/// Handler for DELETE /cache/*key
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Json<DeleteResponse> {
    let key = normalize_key(&key);
    let removed = state.cache.invalidate(&key).await;
    Json(DeleteResponse::new(key, removed))
}

/// Handler for DELETE /groups/:name
pub async fn group_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Json<GroupInvalidateResponse> {
    let removed = state.cache.invalidate_group(&name).await;
    Json(GroupInvalidateResponse {
        group: name,
        removed,
    })
}

/// Handler for POST /events
///
/// Queues the event; the reconciler applies it in arrival order.
pub async fn event_handler(
    State(state): State<AppState>,
    Json(event): Json<ChangeEvent>,
) -> Result<(StatusCode, Json<EventAccepted>)> {
    let summary = event.to_string();
    state.events.publish(event).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(EventAccepted {
            accepted: true,
            event: summary,
        }),
    ))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let stats = state.cache.stats().await;
    let pending = state.cache.pending_len().await;

    Json(StatsResponse::new(&stats, pending, state.reconciler.state()))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

/// Wildcard captures map to keys without a leading slash.
fn normalize_key(raw: &str) -> String {
    raw.trim_start_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::SetOptions;
    use crate::config::CacheConfig;
    use crate::realtime::{ChannelTransport, EventTransport, Operation, ResourceRoutes};
    use futures::StreamExt;
    use serde_json::json;
    use std::time::Duration;

    /// Upstream points at a closed port, so every miss fails fast.
    fn test_state() -> (AppState, ChannelTransport) {
        let cache = ResponseCache::new(CacheConfig::default().with_max_size(1024));
        let upstream = UpstreamClient::new("http://127.0.0.1:1", Duration::from_millis(500)).unwrap();
        let (events, transport) = ChannelTransport::new(16);
        let reconciler = Arc::new(Reconciler::new(cache.clone(), ResourceRoutes::standard()));
        (AppState::new(cache, upstream, events, reconciler), transport)
    }

    fn set_request(value: serde_json::Value, version: Option<u64>) -> SetRequest {
        SetRequest {
            value,
            version,
            ttl_ms: None,
        }
    }

    #[tokio::test]
    async fn test_fetch_handler_serves_cached_value() {
        let (state, _transport) = test_state();
        state
            .cache
            .set("api/blog/all", json!(["a"]), SetOptions::default())
            .await
            .unwrap();

        let response = fetch_handler(State(state), Path("blog/all".to_string()))
            .await
            .unwrap();
        assert_eq!(response.key, "api/blog/all");
        assert_eq!(response.value, json!(["a"]));
    }

    #[tokio::test]
    async fn test_fetch_handler_reports_upstream_failure() {
        let (state, _transport) = test_state();

        let result = fetch_handler(State(state.clone()), Path("user/1".to_string())).await;
        assert!(matches!(result, Err(CacheError::Fetch { .. })));
        assert!(state.cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_set_handler_versions() {
        let (state, _transport) = test_state();
        let key = || Path("api/user/1".to_string());

        let (status, body) = set_handler(State(state.clone()), key(), Json(set_request(json!(1), Some(5))))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.version, Some(5));

        let (status, body) = set_handler(State(state.clone()), key(), Json(set_request(json!(0), Some(4))))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(!body.stored);
        assert_eq!(state.cache.entry("api/user/1").await.unwrap().value, json!(1));
    }

    #[tokio::test]
    async fn test_set_handler_rejects_oversize() {
        let (state, _transport) = test_state();
        let big = json!("x".repeat(2048));

        let (status, _) = set_handler(State(state.clone()), Path("api/big".to_string()), Json(set_request(big, None)))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert!(state.cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_set_handler_invalid_request() {
        let (state, _transport) = test_state();
        let req = SetRequest {
            value: json!(1),
            version: None,
            ttl_ms: Some(0),
        };
        let result = set_handler(State(state), Path("api/x".to_string()), Json(req)).await;
        assert!(matches!(result, Err(CacheError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_delete_and_group_handlers() {
        let (state, _transport) = test_state();
        for key in ["api/blog/post/1", "api/blog/all", "api/user/1"] {
            state.cache.set(key, json!(1), SetOptions::default()).await.unwrap();
        }

        let response = delete_handler(State(state.clone()), Path("api/user/1".to_string())).await;
        assert!(response.removed);
        let response = delete_handler(State(state.clone()), Path("api/user/1".to_string())).await;
        assert!(!response.removed);

        let response = group_handler(State(state.clone()), Path("blog".to_string())).await;
        assert_eq!(response.removed, 2);
        assert!(state.cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_event_handler_enqueues() {
        let (state, mut transport) = test_state();
        let mut events = transport.connect().await.unwrap();

        let (status, body) = event_handler(
            State(state),
            Json(ChangeEvent::new("post", "9", Operation::Deleted)),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body.event, "Deleted post/9");
        assert_eq!(events.next().await.unwrap().resource_id, "9");
    }

    #[tokio::test]
    async fn test_event_handler_without_reconciler() {
        let (state, transport) = test_state();
        drop(transport);

        let result = event_handler(
            State(state),
            Json(ChangeEvent::new("post", "9", Operation::Deleted)),
        )
        .await;
        assert!(matches!(result, Err(CacheError::Transport(_))));
    }

    #[tokio::test]
    async fn test_stats_and_health_handlers() {
        let (state, _transport) = test_state();

        let response = stats_handler(State(state)).await;
        assert_eq!(response.hits, 0);
        assert_eq!(response.total_entries, 0);

        let response = health_handler().await;
        assert_eq!(response.status, "healthy");
    }
}
