//! Observability for the offline cache.

pub mod metrics;
