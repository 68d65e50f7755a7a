//! Offline cache configuration.
//!
//! Two kinds of configuration live here:
//!
//! - [`WorkerConfig`] describes what the worker caches: the cache version
//!   naming the live namespace, the app-shell paths precached at install,
//!   the fallback document served to offline navigations, and the byte
//!   limit on runtime caching. The defaults are compiled in and handed to
//!   the worker at construction.
//! - [`Config`] configures the proxy binary hosting the worker and is
//!   loaded from environment variables.

use std::collections::HashMap;
use std::env;
use thiserror::Error;

/// Cache version naming the live namespace.
pub const DEFAULT_CACHE_VERSION: &str = "untrapd-landing-v1.0.0";

/// Paths precached during install.
pub const DEFAULT_APP_SHELL: &[&str] = &[
    "/",
    "/index.html",
    "/styles.css",
    "/script.js",
    "/favicon.svg",
    "/favicon.png",
];

/// Document served to navigational requests when the network is down.
pub const DEFAULT_FALLBACK_DOCUMENT: &str = "/index.html";

/// Default HTTP bind address of the proxy.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8081";

/// Default timeout for a single origin fetch in seconds.
pub const DEFAULT_FETCH_TIMEOUT_SECONDS: u64 = 10;

/// Default limit on stored body bytes (64 MiB).
pub const DEFAULT_MAX_CACHE_BYTES: u64 = 64 * 1024 * 1024;

/// What the worker caches and under which namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    /// Name of the live cache namespace.
    pub cache_version: String,

    /// Paths fetched and stored during install.
    pub app_shell: Vec<String>,

    /// Path served from the cache when a navigation cannot reach the network.
    pub fallback_document: String,

    /// Stored body bytes past which runtime misses are served but not
    /// stored. The app shell is always precached in full.
    pub max_cache_bytes: u64,
}

impl WorkerConfig {
    /// Create a worker configuration with the default fallback document.
    pub fn new(cache_version: impl Into<String>, app_shell: &[&str]) -> Self {
        Self {
            cache_version: cache_version.into(),
            app_shell: app_shell.iter().map(|p| (*p).to_string()).collect(),
            fallback_document: DEFAULT_FALLBACK_DOCUMENT.to_string(),
            max_cache_bytes: DEFAULT_MAX_CACHE_BYTES,
        }
    }

    pub fn with_max_cache_bytes(mut self, max_cache_bytes: u64) -> Self {
        self.max_cache_bytes = max_cache_bytes;
        self
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_VERSION, DEFAULT_APP_SHELL)
    }
}

/// Proxy configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Origin serving the site (e.g., "https://hub.untrapd.com").
    pub origin_url: String,

    /// Server bind address (default: "0.0.0.0:8081").
    pub bind_address: String,

    /// Timeout for each origin fetch.
    pub fetch_timeout_seconds: u64,

    /// Bind address of the Prometheus scrape listener, if enabled.
    pub metrics_bind_address: Option<String>,

    /// Limit on stored body bytes (default: 64 MiB).
    pub max_cache_bytes: u64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid origin URL: {0}")]
    InvalidOriginUrl(String),

    #[error("Invalid fetch timeout configuration: {0}")]
    InvalidFetchTimeout(String),

    #[error("Invalid cache size configuration: {0}")]
    InvalidMaxCacheBytes(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let origin_url = vars
            .get("ORIGIN_URL")
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar("ORIGIN_URL".to_string()))?
            .trim_end_matches('/')
            .to_string();

        if !(origin_url.starts_with("http://") || origin_url.starts_with("https://")) {
            return Err(ConfigError::InvalidOriginUrl(format!(
                "ORIGIN_URL must start with http:// or https://, got '{}'",
                origin_url
            )));
        }

        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let fetch_timeout_seconds = if let Some(value_str) = vars.get("FETCH_TIMEOUT_SECONDS") {
            let value: u64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidFetchTimeout(format!(
                    "FETCH_TIMEOUT_SECONDS must be a valid positive integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value == 0 {
                return Err(ConfigError::InvalidFetchTimeout(
                    "FETCH_TIMEOUT_SECONDS must be greater than 0".to_string(),
                ));
            }

            value
        } else {
            DEFAULT_FETCH_TIMEOUT_SECONDS
        };

        let metrics_bind_address = vars
            .get("METRICS_BIND_ADDRESS")
            .filter(|v| !v.is_empty())
            .cloned();

        let max_cache_bytes = if let Some(value_str) = vars.get("MAX_CACHE_BYTES") {
            let value: u64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidMaxCacheBytes(format!(
                    "MAX_CACHE_BYTES must be a valid positive integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value == 0 {
                return Err(ConfigError::InvalidMaxCacheBytes(
                    "MAX_CACHE_BYTES must be greater than 0".to_string(),
                ));
            }

            value
        } else {
            DEFAULT_MAX_CACHE_BYTES
        };

        Ok(Config {
            origin_url,
            bind_address,
            fetch_timeout_seconds,
            metrics_bind_address,
            max_cache_bytes,
        })
    }
}
