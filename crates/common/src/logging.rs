//! Tracing subscriber setup shared by the service binaries.

use crate::config::ObservabilityConfig;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Errors raised while installing the global subscriber.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Invalid log filter '{filter}': {reason}")]
    InvalidFilter { filter: String, reason: String },

    #[error("Failed to install tracing subscriber: {0}")]
    Install(String),
}

/// Install the global tracing subscriber.
///
/// Exactly one of the JSON or human-readable `fmt` layers is active,
/// selected by [`ObservabilityConfig::json_logs`].
///
/// # Errors
///
/// Returns [`LoggingError`] if the filter directives do not parse or a
/// global subscriber is already installed.
pub fn init_tracing(config: &ObservabilityConfig) -> Result<(), LoggingError> {
    let filter =
        EnvFilter::try_new(&config.log_filter).map_err(|e| LoggingError::InvalidFilter {
            filter: config.log_filter.clone(),
            reason: e.to_string(),
        })?;

    let json_layer = config.json_logs.then(|| fmt::layer().json());
    let text_layer = (!config.json_logs).then(fmt::layer);

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .try_init()
        .map_err(|e| LoggingError::Install(e.to_string()))
}
