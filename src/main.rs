//! Synced Cache - caching sidecar for a JSON API
//!
//! Serves reads through the cache, accepts change events over HTTP and keeps
//! a snapshot on disk across restarts.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use synced_cache::{
    create_router, spawn_persist_task, spawn_reconcile_task, spawn_sweep_task, AppState,
    ChannelTransport, Config, FileStorage, PersistenceSync, Reconciler, ResourceRoutes,
    ResponseCache, UpstreamClient,
};

/// Capacity of the queue between POST /events and the reconciler.
const EVENT_QUEUE_CAPACITY: usize = 256;

/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Create the cache and restore the last snapshot
/// 4. Start sweep, snapshot and reconciler tasks
/// 5. Serve HTTP until SIGINT/SIGTERM, then flush once more
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "synced_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Synced Cache sidecar");

    let config = Config::from_env();
    info!(
        port = config.server_port,
        upstream = %config.upstream_url,
        max_items = config.cache.max_items,
        max_size = config.cache.max_size,
        default_ttl_ms = config.cache.default_ttl.as_millis() as u64,
        cache_version = %config.cache.cache_version,
        "Configuration loaded"
    );

    let cache = ResponseCache::new(config.cache.clone());
    let storage = Arc::new(FileStorage::new(config.storage_dir.clone()));
    let sync = Arc::new(PersistenceSync::for_cache(storage, &cache));
    let loaded = sync.load(&cache).await;
    info!(?loaded, "Startup snapshot processed");

    let upstream = UpstreamClient::new(config.upstream_url.clone(), config.upstream_timeout)?;
    let (events, transport) = ChannelTransport::new(EVENT_QUEUE_CAPACITY);
    let reconciler = Arc::new(
        Reconciler::new(cache.clone(), ResourceRoutes::standard())
            .with_optimistic_updates(config.optimistic_updates),
    );

    let tasks = vec![
        spawn_sweep_task(cache.clone(), config.cache.sweep_interval),
        spawn_persist_task(cache.clone(), sync.clone(), config.cache.sync_interval),
        spawn_reconcile_task(reconciler.clone(), transport),
    ];
    info!("Background tasks started");

    let app = create_router(AppState::new(cache.clone(), upstream, events, reconciler));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(tasks))
        .await
        .context("server error")?;

    let flushed = sync.flush(&cache).await;
    info!(?flushed, "Final snapshot written");
    cache.dispose().await;

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for Ctrl+C or SIGTERM, then stops the background tasks.
async fn shutdown_signal(tasks: Vec<JoinHandle<()>>) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(error = %err, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    for task in &tasks {
        task.abort();
    }
    warn!(count = tasks.len(), "Background tasks aborted");
}
