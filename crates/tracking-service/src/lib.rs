//! Email tracking service library.
//!
//! Records email open and click events against an external data store and
//! answers with a transparent pixel (open) or a redirect (click).
//!
//! # Architecture
//!
//! ```text
//! routes/mod.rs -> handlers/*.rs -> services/store_client.rs -> data store RPC
//! ```
//!
//! # Modules
//!
//! - `config` - Service configuration from environment
//! - `errors` - Error types with HTTP status code mapping
//! - `handlers` - HTTP request handlers
//! - `middleware` - HTTP metrics middleware
//! - `models` - Query and RPC payload models
//! - `observability` - Prometheus metrics
//! - `routes` - Axum router setup
//! - `services` - Data store client
//! - `tracking_urls` - Builders for pixel and click URLs

pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod routes;
pub mod services;
pub mod tracking_urls;
