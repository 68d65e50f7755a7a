//! HTTP request handlers for the tracking service.

pub mod health;
pub mod metrics;
pub mod track;

pub use health::health_check;
pub use metrics::metrics_handler;
pub use track::track_event;
