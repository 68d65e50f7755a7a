//! Metrics definitions for the tracking service.
//!
//! All metrics follow Prometheus naming conventions:
//! - `tracking_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded to prevent cardinality explosion:
//! - `method`: 7 values max (GET, POST, PATCH, DELETE, PUT, HEAD, OPTIONS)
//! - `endpoint`: 4 values (`/track`, `/health`, `/metrics`, `/other`)
//! - `event`: `open`, `click`, `invalid`
//! - `outcome`: bounded by `TrackingError::outcome_label` plus `recorded`/`rejected`
//!
//! Message identifiers and destination URLs are never used as labels.

use crate::routes::TRACK_PATH;
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize Prometheus metrics recorder and return the handle
/// for serving metrics via HTTP.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if Prometheus recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("tracking_http_request".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.150, 0.200, 0.300, 0.500, 1.000, 2.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        .set_buckets_for_metric(
            Matcher::Prefix("tracking_store_call".to_string()),
            &[
                0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000, 10.000,
            ],
        )
        .map_err(|e| format!("Failed to set store call buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion
///
/// Metric: `tracking_http_requests_total`, `tracking_http_request_duration_seconds`
/// Labels: `method`, `endpoint`, `status`
pub fn record_http_request(method: &str, endpoint: &str, status_code: u16, duration: Duration) {
    let normalized_endpoint = normalize_endpoint(endpoint);
    let status = categorize_status_code(status_code);

    histogram!("tracking_http_request_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status" => status
    )
    .record(duration.as_secs_f64());

    counter!("tracking_http_requests_total",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

/// Categorize HTTP status code.
///
/// Redirects count as success since every click answers with a 302.
fn categorize_status_code(status_code: u16) -> &'static str {
    match status_code {
        200..=399 => "success",
        408 | 504 => "timeout",
        _ => "error",
    }
}

/// Normalize endpoint path to prevent label cardinality explosion
fn normalize_endpoint(path: &str) -> &'static str {
    match path {
        TRACK_PATH => TRACK_PATH,
        "/health" => "/health",
        "/metrics" => "/metrics",
        _ => "/other",
    }
}

// ============================================================================
// Tracking Metrics
// ============================================================================

/// Record the outcome of a tracking request
///
/// Metric: `tracking_events_total`
/// Labels: `event`, `outcome`
pub fn record_tracking_event(event: &'static str, outcome: &'static str) {
    counter!("tracking_events_total",
        "event" => event,
        "outcome" => outcome
    )
    .increment(1);
}

/// Record the latency of a data store call
///
/// Metric: `tracking_store_call_duration_seconds`
/// Labels: `operation`
pub fn record_store_call(operation: &'static str, duration: Duration) {
    histogram!("tracking_store_call_duration_seconds",
        "operation" => operation
    )
    .record(duration.as_secs_f64());
}
