//! Metrics definitions for the offline cache.
//!
//! All metrics follow Prometheus naming conventions:
//! - `offline_cache_` prefix
//! - `_total` suffix for counters
//!
//! # Cardinality
//!
//! Labels are bounded:
//! - `outcome`: `hit`, `miss`, `fallback`, `offline_page`
//! - `status`: status class (`2xx`, `3xx`, `4xx`, `5xx`) or `error`
//! - install `status`: `success`, `failure`
//! - `reason`: `private`, `capacity`
//!
//! Request URLs are never used as labels.

use metrics::counter;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;

/// Install the Prometheus recorder with a scrape listener on `addr`.
///
/// Must be called from within a Tokio runtime.
///
/// # Errors
///
/// Returns error if the recorder is already installed or the listener
/// cannot be started.
pub fn init_metrics_exporter(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()
}

/// Record how an intercepted request was served.
///
/// Metric: `offline_cache_lookups_total`
/// Labels: `outcome`
pub fn record_lookup(outcome: &'static str) {
    counter!("offline_cache_lookups_total", "outcome" => outcome).increment(1);
}

/// Record a network fetch.
///
/// Metric: `offline_cache_network_fetches_total`
/// Labels: `status` (`None` means the fetch failed)
pub fn record_network_fetch(status_code: Option<u16>) {
    counter!("offline_cache_network_fetches_total",
        "status" => categorize_status_code(status_code)
    )
    .increment(1);
}

/// Record an install attempt.
///
/// Metric: `offline_cache_install_total`
/// Labels: `status`
pub fn record_install(success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!("offline_cache_install_total", "status" => status).increment(1);
}

/// Record namespaces deleted during activation or a clear.
///
/// Metric: `offline_cache_namespaces_purged_total`
pub fn record_namespaces_purged(count: usize) {
    counter!("offline_cache_namespaces_purged_total").increment(count as u64);
}

/// Record a 200 response that was served but not stored.
///
/// Metric: `offline_cache_store_skipped_total`
/// Labels: `reason` (`private` for client-specific responses, `capacity`
/// when the cache is full)
pub fn record_store_skipped(reason: &'static str) {
    counter!("offline_cache_store_skipped_total", "reason" => reason).increment(1);
}

fn categorize_status_code(status_code: Option<u16>) -> &'static str {
    match status_code {
        Some(200..=299) => "2xx",
        Some(300..=399) => "3xx",
        Some(400..=499) => "4xx",
        Some(_) => "5xx",
        None => "error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categorize_status_code() {
        assert_eq!(categorize_status_code(Some(200)), "2xx");
        assert_eq!(categorize_status_code(Some(304)), "3xx");
        assert_eq!(categorize_status_code(Some(404)), "4xx");
        assert_eq!(categorize_status_code(Some(502)), "5xx");
        assert_eq!(categorize_status_code(None), "error");
    }

    #[test]
    fn test_record_functions_without_recorder() {
        // No recorder installed: calls are no-ops and must not panic
        record_lookup("miss");
        record_network_fetch(Some(200));
        record_network_fetch(None);
        record_install(true);
        record_namespaces_purged(2);
        record_store_skipped("capacity");
    }
}
