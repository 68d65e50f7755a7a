//! Shared configuration types.

use std::collections::HashMap;

/// Environment variable holding the tracing filter directives.
pub const LOG_FILTER_VAR: &str = "RUST_LOG";

/// Environment variable selecting the log output format (`json` or `pretty`).
pub const LOG_FORMAT_VAR: &str = "LOG_FORMAT";

/// Observability configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservabilityConfig {
    /// `EnvFilter` directives (e.g. `tracking_service=debug,tower_http=info`)
    pub log_filter: String,
    /// Enable JSON-formatted logs
    pub json_logs: bool,
}

impl ObservabilityConfig {
    /// Load observability settings from environment variables.
    #[must_use]
    pub fn from_env(default_filter: &str) -> Self {
        Self::from_vars(&std::env::vars().collect(), default_filter)
    }

    /// Load observability settings from a `HashMap` (for testing).
    ///
    /// Unknown `LOG_FORMAT` values fall back to human-readable output.
    #[must_use]
    pub fn from_vars(vars: &HashMap<String, String>, default_filter: &str) -> Self {
        let log_filter = vars
            .get(LOG_FILTER_VAR)
            .filter(|v| !v.trim().is_empty())
            .cloned()
            .unwrap_or_else(|| default_filter.to_string());

        let json_logs = vars
            .get(LOG_FORMAT_VAR)
            .is_some_and(|v| v.eq_ignore_ascii_case("json"));

        Self {
            log_filter,
            json_logs,
        }
    }
}
