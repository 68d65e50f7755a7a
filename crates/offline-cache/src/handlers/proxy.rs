//! Cache-first reverse proxy handler.
//!
//! Every request that is not a maintenance route is turned into a
//! [`FetchRequest`] and served by the worker. The response carries an
//! `x-offline-cache` header naming its source (`hit`, `miss`, `fallback`,
//! `offline_page`).

use crate::errors::CacheError;
use crate::models::{strip_hop_by_hop, FetchRequest, RequestDestination};
use crate::routes::AppState;
use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::HeaderValue,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::instrument;

/// Largest request body forwarded to the origin.
pub const MAX_REQUEST_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Response header naming where the response came from.
pub const CACHE_STATUS_HEADER: &str = "x-offline-cache";

/// Fallback handler for every proxied request.
#[instrument(skip_all, name = "offline_cache.proxy", fields(method = %request.method(), uri = %request.uri()))]
pub async fn proxy_request(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
) -> Result<Response, CacheError> {
    let fetch_request = into_fetch_request(request).await?;
    let outcome = state.worker.fetch(&fetch_request).await?;

    let mut response = outcome.response.into_response();
    response.headers_mut().insert(
        CACHE_STATUS_HEADER,
        HeaderValue::from_static(outcome.source.lookup_label()),
    );

    Ok(response)
}

async fn into_fetch_request(request: Request<Body>) -> Result<FetchRequest, CacheError> {
    let (parts, body) = request.into_parts();

    let url = parts
        .uri
        .path_and_query()
        .map_or_else(|| "/".to_string(), |pq| pq.as_str().to_string());
    let destination = RequestDestination::from_headers(&parts.headers);

    let body = to_bytes(body, MAX_REQUEST_BODY_BYTES)
        .await
        .map_err(|e| CacheError::InvalidRequest(format!("request body: {}", e)))?;

    let mut headers = parts.headers;
    strip_hop_by_hop(&mut headers);

    Ok(FetchRequest {
        method: parts.method,
        url,
        destination,
        headers,
        body,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::http::{header, Method};

    #[tokio::test]
    async fn test_into_fetch_request_reads_navigation_metadata() {
        let request = Request::builder()
            .method("GET")
            .uri("/pricing?plan=pro")
            .header(header::HOST, "proxy.test")
            .header("sec-fetch-mode", "navigate")
            .header(header::ACCEPT, "text/html")
            .body(Body::empty())
            .unwrap();

        let fetch_request = into_fetch_request(request).await.unwrap();

        assert_eq!(fetch_request.method, Method::GET);
        assert_eq!(fetch_request.url, "/pricing?plan=pro");
        assert!(fetch_request.destination.is_navigational());
        assert!(fetch_request.headers.get(header::HOST).is_none());
        assert_eq!(
            fetch_request.headers.get(header::ACCEPT).unwrap(),
            "text/html"
        );
    }

    #[tokio::test]
    async fn test_into_fetch_request_keeps_body() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/subscribe")
            .body(Body::from("email=a@b.test"))
            .unwrap();

        let fetch_request = into_fetch_request(request).await.unwrap();

        assert_eq!(fetch_request.method, Method::POST);
        assert_eq!(fetch_request.body.as_ref(), b"email=a@b.test");
        assert!(!fetch_request.destination.is_navigational());
    }
}
