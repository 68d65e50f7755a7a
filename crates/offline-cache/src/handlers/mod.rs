//! HTTP handlers for the offline cache proxy.

pub mod maintenance;
pub mod proxy;

pub use maintenance::{cache_size, clear_cache};
pub use proxy::proxy_request;
