//! Secret types for protecting sensitive values from accidental logging.
//!
//! Re-exports the [`secrecy`] types used for API keys and service tokens,
//! such as the data store service key held by the tracking service.
//!
//! `SecretString` implements `Debug` with redaction, so a struct that derives
//! `Debug` and holds a secret can be logged with `{:?}` or tracing without
//! leaking the value. Reading the value requires an explicit
//! `expose_secret()` call, and the value is zeroized on drop.
//!
//! # Example
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug)]
//! struct StoreCredentials {
//!     project_url: String,
//!     service_key: SecretString,
//! }
//!
//! let creds = StoreCredentials {
//!     project_url: "https://project.supabase.co".to_string(),
//!     service_key: SecretString::from("service-role-key"),
//! };
//!
//! assert!(!format!("{creds:?}").contains("service-role-key"));
//! assert_eq!(creds.service_key.expose_secret(), "service-role-key");
//! ```

pub use secrecy::{ExposeSecret, SecretString};
