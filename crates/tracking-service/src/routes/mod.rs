//! HTTP routes for the tracking service.
//!
//! Defines the Axum router and application state.

use crate::config::Config;
use crate::handlers;
use crate::middleware::http_metrics_middleware;
use crate::services::StoreClientTrait;
use axum::{middleware, routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

pub use crate::observability::metrics::init_metrics_recorder;

/// Path of the tracking endpoint.
pub const TRACK_PATH: &str = "/track";

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Service configuration.
    pub config: Config,

    /// Data store client used to record events.
    pub store: Arc<dyn StoreClientTrait>,
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/track` - Open pixel / click redirect endpoint
/// - `/health` - Liveness probe (simple "OK")
/// - `/metrics` - Prometheus metrics endpoint
/// - TraceLayer for request logging
/// - HTTP metrics middleware
/// - 30 second request timeout
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let public_routes = Router::new()
        .route(TRACK_PATH, get(handlers::track_event))
        .route("/health", get(handlers::health_check))
        .with_state(state);

    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    // Layer order (bottom-to-top execution):
    // 1. TimeoutLayer - Timeout the request (innermost)
    // 2. TraceLayer - Log request details
    // 3. http_metrics_middleware - Record ALL responses (outermost)
    public_routes
        .merge(metrics_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(middleware::from_fn(http_metrics_middleware))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::handlers::track::TRANSPARENT_GIF;
    use crate::services::{MockStoreClient, RecordedCall};
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use common::secret::SecretString;
    use http_body_util::BodyExt;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use tower::ServiceExt;

    fn test_config() -> Config {
        Config {
            store_url: "http://store.test".to_string(),
            store_service_key: SecretString::from("k"),
            bind_address: "127.0.0.1:0".to_string(),
            store_timeout_seconds: 1,
            public_base_url: "http://tracking.test".to_string(),
        }
    }

    fn test_app(store: Arc<MockStoreClient>) -> Router {
        let state = Arc::new(AppState {
            config: test_config(),
            store,
        });
        let handle = PrometheusBuilder::new().build_recorder().handle();
        build_routes(state, handle)
    }

    async fn send_get(app: Router, uri: &str) -> axum::response::Response {
        let request = Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        app.oneshot(request).await.unwrap()
    }

    #[test]
    fn test_app_state_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<AppState>();
    }

    #[tokio::test]
    async fn test_open_returns_pixel() {
        let store = Arc::new(MockStoreClient::recording());
        let response = send_get(test_app(store.clone()), "/track?event=open&id=msg-1").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "image/gif"
        );
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body.as_ref(), &TRANSPARENT_GIF[..]);
        assert_eq!(store.call_count(), 1);
    }

    #[tokio::test]
    async fn test_click_decodes_destination() {
        let store = Arc::new(MockStoreClient::recording());
        let response = send_get(
            test_app(store.clone()),
            "/track?event=click&id=msg-1&url=https%3A%2F%2Fexample.com%2Fpath%3Fa%3D1%26b%3D2",
        )
        .await;

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "https://example.com/path?a=1&b=2"
        );
        assert_eq!(
            store.calls(),
            vec![RecordedCall::Click {
                message_id: "msg-1".to_string(),
                destination: "https://example.com/path?a=1&b=2".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_header_injection_is_rejected_before_store_call() {
        let store = Arc::new(MockStoreClient::recording());
        let response = send_get(
            test_app(store.clone()),
            "/track?event=click&id=msg-1&url=https%3A%2F%2Fa.test%0D%0ASet-Cookie%3A%20x%3D1",
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(store.call_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_route_returns_404() {
        let store = Arc::new(MockStoreClient::recording());
        let response = send_get(test_app(store), "/v1/nonexistent").await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
