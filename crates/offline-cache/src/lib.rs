//! Offline cache library.
//!
//! A cache-first request interceptor with an install -> activate -> fetch
//! lifecycle, versioned cache namespaces and an offline fallback for
//! navigations. The `offline-cache` binary hosts it as a reverse proxy in
//! front of a static site.
//!
//! # Architecture
//!
//! ```text
//! routes/mod.rs -> handlers/*.rs -> worker.rs -> storage/*.rs
//!                                            \-> services/network.rs -> origin
//! ```
//!
//! # Modules
//!
//! - `config` - Worker defaults and proxy configuration from environment
//! - `errors` - Error types with HTTP status code mapping
//! - `handlers` - Proxy and cache maintenance handlers
//! - `models` - Request keys, response snapshots, lifecycle phases
//! - `observability` - Prometheus metrics
//! - `routes` - Axum router setup
//! - `services` - Network fetcher
//! - `storage` - Cache namespaces
//! - `worker` - Lifecycle and cache-first fetch

pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod observability;
pub mod routes;
pub mod services;
pub mod storage;
pub mod worker;
