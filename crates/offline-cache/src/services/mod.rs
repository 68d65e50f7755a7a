//! External collaborators of the worker.

pub mod network;

pub use network::mock::MockFetcher;
pub use network::{HttpFetcher, NetworkFetcher};
