//! HTTP metrics middleware for capturing all request/response metrics
//!
//! Captures metrics for every HTTP response, including framework-level
//! errors that occur before handlers run (404, 405, malformed query strings).

use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

use crate::observability::metrics::record_http_request;

/// Middleware that records method, normalized path, status and duration
/// for every response.
///
/// Applied as the outermost layer.
pub async fn http_metrics_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();

    // Execute the request
    let response = next.run(request).await;

    // Record metrics
    let duration = start.elapsed();
    let status_code = response.status().as_u16();
    record_http_request(&method, &path, status_code, duration);

    response
}
