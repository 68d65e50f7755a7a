//! Health check handler.

use tracing::instrument;

/// Liveness probe.
///
/// Returns "OK" whenever the process is serving requests. The data store is
/// not contacted.
#[instrument(skip_all, name = "tracking.health.check")]
pub async fn health_check() -> &'static str {
    "OK"
}
