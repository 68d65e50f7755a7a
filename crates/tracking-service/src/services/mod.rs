//! Service layer for the tracking service.
//!
//! # Components
//!
//! - `store_client` - Data store RPC client for recording events

pub mod store_client;

pub use store_client::mock::{MockStoreClient, RecordedCall};
pub use store_client::{RecordOutcome, StoreClient, StoreClientTrait};
