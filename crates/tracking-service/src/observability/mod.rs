//! Observability for the tracking service.

pub mod metrics;
