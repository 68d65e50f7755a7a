//! Offline cache proxy
//!
//! Precaches the app shell from the origin, activates the worker, then
//! serves every request cache-first.

use common::config::ObservabilityConfig;
use common::logging::init_tracing;
use offline_cache::config::{Config, WorkerConfig};
use offline_cache::observability::metrics::init_metrics_exporter;
use offline_cache::routes::{self, AppState};
use offline_cache::services::HttpFetcher;
use offline_cache::storage::InMemoryCacheStorage;
use offline_cache::worker::OfflineCacheWorker;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info};

const DEFAULT_LOG_FILTER: &str = "offline_cache=debug,tower_http=debug";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing(&ObservabilityConfig::from_env(DEFAULT_LOG_FILTER))?;

    info!("Starting offline cache proxy");

    // Load configuration
    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;
    let worker_config = WorkerConfig::default().with_max_cache_bytes(config.max_cache_bytes);

    info!(
        origin_url = %config.origin_url,
        bind_address = %config.bind_address,
        fetch_timeout_seconds = config.fetch_timeout_seconds,
        max_cache_bytes = config.max_cache_bytes,
        cache_version = %worker_config.cache_version,
        "Configuration loaded successfully"
    );

    if let Some(metrics_addr) = &config.metrics_bind_address {
        let metrics_addr: SocketAddr = metrics_addr.parse().map_err(|e| {
            error!("Invalid metrics bind address: {}", e);
            e
        })?;
        init_metrics_exporter(metrics_addr).map_err(|e| {
            error!("Failed to initialize metrics: {}", e);
            e
        })?;
        info!("Metrics listening on {}", metrics_addr);
    }

    let network = HttpFetcher::new(
        &config.origin_url,
        Duration::from_secs(config.fetch_timeout_seconds),
    )?;

    let worker = Arc::new(OfflineCacheWorker::new(
        worker_config,
        Arc::new(InMemoryCacheStorage::new()),
        Arc::new(network),
    ));

    // Install and activate before accepting traffic (skip waiting)
    worker.install().await.map_err(|e| {
        error!("Failed to precache app shell: {}", e);
        e
    })?;
    let activation = worker.activate().await?;
    info!(
        cache_version = %activation.cache_version,
        deleted = activation.deleted.len(),
        "Offline cache active"
    );

    let addr: SocketAddr = config.bind_address.parse().map_err(|e| {
        error!("Invalid bind address: {}", e);
        e
    })?;

    let app = routes::build_routes(Arc::new(AppState { worker }));

    info!("Offline cache proxy listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Offline cache proxy shutdown complete");

    Ok(())
}

/// Listens for shutdown signals (SIGTERM, SIGINT).
async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, starting graceful shutdown..."),
            Err(e) => error!("Failed to listen for SIGINT: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, starting graceful shutdown...");
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
