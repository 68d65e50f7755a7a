//! HTTP routes for the offline cache proxy.

use crate::handlers;
use crate::worker::OfflineCacheWorker;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Prefix of the maintenance routes; never proxied.
pub const MAINTENANCE_PREFIX: &str = "/__offline-cache";

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub worker: Arc<OfflineCacheWorker>,
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/__offline-cache/size` - Total cached bytes
/// - `/__offline-cache/clear` - Delete every cache namespace
/// - everything else - served cache-first through the worker
/// - TraceLayer for request logging
/// - 30 second request timeout
pub fn build_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            &format!("{MAINTENANCE_PREFIX}/size"),
            get(handlers::cache_size),
        )
        .route(
            &format!("{MAINTENANCE_PREFIX}/clear"),
            post(handlers::clear_cache),
        )
        .fallback(handlers::proxy_request)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
}
