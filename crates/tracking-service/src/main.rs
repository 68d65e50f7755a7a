//! Email tracking service
//!
//! Entry point for the open/click tracking endpoint.

use common::config::ObservabilityConfig;
use common::logging::init_tracing;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};
use tracking_service::config::Config;
use tracking_service::routes::{self, init_metrics_recorder, AppState};
use tracking_service::services::StoreClient;
use tracking_service::tracking_urls;

const DEFAULT_LOG_FILTER: &str = "tracking_service=debug,tower_http=debug";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing(&ObservabilityConfig::from_env(DEFAULT_LOG_FILTER))?;

    info!("Starting tracking service");

    // Load configuration
    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    // Fail fast on a base URL that cannot produce tracking links
    let pixel_url = tracking_urls::pixel_url(&config.public_base_url, "{message_id}")
        .map_err(|e| {
            error!("Invalid PUBLIC_BASE_URL: {}", e);
            e
        })?;

    info!(
        bind_address = %config.bind_address,
        store_url = %config.store_url,
        store_timeout_seconds = config.store_timeout_seconds,
        pixel_url = %pixel_url,
        "Configuration loaded successfully"
    );

    let metrics_handle = init_metrics_recorder().map_err(|e| {
        error!("Failed to initialize metrics: {}", e);
        e
    })?;

    let store = StoreClient::new(
        config.store_url.clone(),
        config.store_service_key.clone(),
        Duration::from_secs(config.store_timeout_seconds),
    )?;

    // Parse bind address before moving config
    let addr: SocketAddr = config.bind_address.parse().map_err(|e| {
        error!("Invalid bind address: {}", e);
        e
    })?;

    let state = Arc::new(AppState {
        config,
        store: Arc::new(store),
    });

    let app = routes::build_routes(state, metrics_handle);

    info!("Tracking service listening on {}", addr);

    // Start server with graceful shutdown support
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Tracking service shutdown complete");

    Ok(())
}

/// Listens for shutdown signals (SIGTERM, SIGINT).
/// Returns when a shutdown signal is received and drain period is complete.
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

    let drain_secs: u64 = std::env::var("TRACKING_DRAIN_SECONDS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(0);

    if drain_secs > 0 {
        warn!("Draining connections for {} seconds...", drain_secs);
        tokio::time::sleep(Duration::from_secs(drain_secs)).await;
        info!("Drain period complete");
    }
}
