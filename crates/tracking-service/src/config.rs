//! Tracking service configuration.
//!
//! Configuration is loaded from environment variables. The data store
//! service key is held as a secret and redacted in Debug output.

use common::secret::SecretString;
use std::collections::HashMap;
use std::env;
use std::fmt;
use thiserror::Error;

/// Default HTTP bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Default timeout for a single data store call in seconds.
pub const DEFAULT_STORE_TIMEOUT_SECONDS: u64 = 10;

/// Default public base URL used when building tracking links.
pub const DEFAULT_PUBLIC_BASE_URL: &str = "https://hub.untrapd.com";

/// Tracking service configuration.
#[derive(Clone)]
pub struct Config {
    /// Base URL of the Supabase project (e.g., "https://abc.supabase.co").
    pub store_url: String,

    /// Service role key used for the RPC calls.
    pub store_service_key: SecretString,

    /// Server bind address (default: "0.0.0.0:8080").
    pub bind_address: String,

    /// Timeout for each data store RPC call.
    pub store_timeout_seconds: u64,

    /// Public base URL under which `/track` is reachable.
    pub public_base_url: String,
}

/// Custom Debug implementation that redacts sensitive fields.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("store_url", &self.store_url)
            .field("store_service_key", &"[REDACTED]")
            .field("bind_address", &self.bind_address)
            .field("store_timeout_seconds", &self.store_timeout_seconds)
            .field("public_base_url", &self.public_base_url)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid store URL: {0}")]
    InvalidStoreUrl(String),

    #[error("Invalid store timeout configuration: {0}")]
    InvalidStoreTimeout(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let store_url = vars
            .get("SUPABASE_URL")
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar("SUPABASE_URL".to_string()))?
            .trim_end_matches('/')
            .to_string();

        if !(store_url.starts_with("http://") || store_url.starts_with("https://")) {
            return Err(ConfigError::InvalidStoreUrl(format!(
                "SUPABASE_URL must start with http:// or https://, got '{}'",
                store_url
            )));
        }

        let store_service_key = vars
            .get("SUPABASE_SERVICE_KEY")
            .filter(|v| !v.is_empty())
            .map(|v| SecretString::from(v.as_str()))
            .ok_or_else(|| ConfigError::MissingEnvVar("SUPABASE_SERVICE_KEY".to_string()))?;

        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        // Parse store timeout with validation
        let store_timeout_seconds = if let Some(value_str) = vars.get("STORE_TIMEOUT_SECONDS") {
            let value: u64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidStoreTimeout(format!(
                    "STORE_TIMEOUT_SECONDS must be a valid positive integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value == 0 {
                return Err(ConfigError::InvalidStoreTimeout(
                    "STORE_TIMEOUT_SECONDS must be greater than 0".to_string(),
                ));
            }

            value
        } else {
            DEFAULT_STORE_TIMEOUT_SECONDS
        };

        let public_base_url = vars
            .get("PUBLIC_BASE_URL")
            .cloned()
            .unwrap_or_else(|| DEFAULT_PUBLIC_BASE_URL.to_string());

        Ok(Config {
            store_url,
            store_service_key,
            bind_address,
            store_timeout_seconds,
            public_base_url,
        })
    }
}
