//! # Tracking Test Utilities
//!
//! Shared test utilities for the tracking service.
//!
//! This crate provides:
//! - Server test harness (`TestTrackingServer` for E2E tests)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tracking_service::services::MockStoreClient;
//! use tracking_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> anyhow::Result<()> {
//!     let server = TestTrackingServer::spawn(Arc::new(MockStoreClient::recording())).await?;
//!
//!     let response = server
//!         .client()
//!         .get(format!("{}/track?event=open&id=msg-1", server.url()))
//!         .send()
//!         .await?;
//!
//!     assert_eq!(response.status(), 200);
//!     Ok(())
//! }
//! ```

pub mod server_harness;

// Re-export commonly used items
pub use server_harness::*;
