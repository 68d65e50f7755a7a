//! Data store client for recording tracking events.
//!
//! Events are recorded through two Supabase PostgREST RPC functions:
//!
//! - `track_email_open(p_provider_message_id)`
//! - `track_email_click(p_provider_message_id, p_link_url)`
//!
//! Only a transport-level failure (connect error, timeout, unreadable
//! response) is an error. A response with an error status means the store
//! received the call and rejected it; that is reported as
//! [`RecordOutcome::Rejected`] and left for the caller to log.

use crate::errors::TrackingError;
use crate::models::{RecordClickParams, RecordOpenParams};
use common::secret::{ExposeSecret, SecretString};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::{error, instrument, warn};

/// RPC function recording an email open.
pub const RECORD_OPEN_RPC: &str = "track_email_open";

/// RPC function recording a link click.
pub const RECORD_CLICK_RPC: &str = "track_email_click";

/// Default connect timeout in seconds.
const STORE_CONNECT_TIMEOUT_SECS: u64 = 5;

/// Result of a recording call that reached the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    /// The store accepted the event.
    Recorded,
    /// The store answered with an error status.
    Rejected { status: u16 },
}

/// Trait for data store operations (enables mocking).
#[async_trait::async_trait]
pub trait StoreClientTrait: Send + Sync {
    /// Record that the message with `message_id` was opened.
    async fn record_open(&self, message_id: &str) -> Result<RecordOutcome, TrackingError>;

    /// Record that a link to `destination` in the message was clicked.
    async fn record_click(
        &self,
        message_id: &str,
        destination: &str,
    ) -> Result<RecordOutcome, TrackingError>;
}

/// HTTP client for the Supabase RPC endpoints.
#[derive(Clone)]
pub struct StoreClient {
    /// HTTP client with configured timeouts.
    client: Client,

    /// Base URL of the Supabase project, without trailing slash.
    base_url: String,

    /// Service role key sent as `apikey` and bearer token.
    service_key: SecretString,
}

impl StoreClient {
    /// Create a new store client.
    ///
    /// # Errors
    ///
    /// Returns `TrackingError::Internal` if the HTTP client cannot be built.
    pub fn new(
        base_url: String,
        service_key: SecretString,
        timeout: Duration,
    ) -> Result<Self, TrackingError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(STORE_CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| {
                error!(target: "tracking.services.store_client", error = %e, "Failed to build HTTP client");
                TrackingError::Internal
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key,
        })
    }

    fn rpc_url(&self, function: &str) -> String {
        format!("{}/rest/v1/rpc/{}", self.base_url, function)
    }

    /// Invoke an RPC function with a JSON body.
    async fn call_rpc<P: Serialize + Sync>(
        &self,
        function: &str,
        params: &P,
    ) -> Result<RecordOutcome, TrackingError> {
        let key = self.service_key.expose_secret();

        let response = self
            .client
            .post(self.rpc_url(function))
            .header("apikey", key)
            .header("Authorization", format!("Bearer {}", key))
            .json(params)
            .send()
            .await
            .map_err(|e| {
                warn!(target: "tracking.services.store_client", error = %e, function = %function, "Store request failed");
                TrackingError::StoreRecordingFailure(format!("{} request failed: {}", function, e))
            })?;

        let status = response.status();
        if status.is_success() {
            Ok(RecordOutcome::Recorded)
        } else {
            let body = response.text().await.unwrap_or_default();
            warn!(
                target: "tracking.services.store_client",
                function = %function,
                status = %status,
                body = %body,
                "Store rejected tracking call"
            );
            Ok(RecordOutcome::Rejected {
                status: status.as_u16(),
            })
        }
    }
}

#[async_trait::async_trait]
impl StoreClientTrait for StoreClient {
    #[instrument(skip(self), name = "tracking.store.record_open")]
    async fn record_open(&self, message_id: &str) -> Result<RecordOutcome, TrackingError> {
        let params = RecordOpenParams {
            p_provider_message_id: message_id,
        };
        self.call_rpc(RECORD_OPEN_RPC, &params).await
    }

    #[instrument(skip(self), name = "tracking.store.record_click")]
    async fn record_click(
        &self,
        message_id: &str,
        destination: &str,
    ) -> Result<RecordOutcome, TrackingError> {
        let params = RecordClickParams {
            p_provider_message_id: message_id,
            p_link_url: destination,
        };
        self.call_rpc(RECORD_CLICK_RPC, &params).await
    }
}

/// Mock store client module for testing.
///
/// This module provides a mock implementation of the store client for use in tests.
pub mod mock {

    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// A call observed by [`MockStoreClient`].
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum RecordedCall {
        Open {
            message_id: String,
        },
        Click {
            message_id: String,
            destination: String,
        },
    }

    #[derive(Debug, Clone, Copy)]
    enum Behavior {
        Record,
        Reject(u16),
        Fail,
    }

    /// Mock store client for unit testing.
    pub struct MockStoreClient {
        behavior: Behavior,
        /// Number of calls made.
        call_count: AtomicUsize,
        /// Calls in arrival order.
        calls: Mutex<Vec<RecordedCall>>,
    }

    impl MockStoreClient {
        fn with_behavior(behavior: Behavior) -> Self {
            Self {
                behavior,
                call_count: AtomicUsize::new(0),
                calls: Mutex::new(Vec::new()),
            }
        }

        /// Create a mock that records every event.
        pub fn recording() -> Self {
            Self::with_behavior(Behavior::Record)
        }

        /// Create a mock that answers every call with an error status.
        pub fn rejecting(status: u16) -> Self {
            Self::with_behavior(Behavior::Reject(status))
        }

        /// Create a mock whose calls fail at the transport level.
        pub fn failing() -> Self {
            Self::with_behavior(Behavior::Fail)
        }

        /// Get the number of calls made.
        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }

        /// Get the calls made so far.
        pub fn calls(&self) -> Vec<RecordedCall> {
            self.calls
                .lock()
                .map(|calls| calls.clone())
                .unwrap_or_default()
        }

        fn observe(&self, call: RecordedCall) -> Result<RecordOutcome, TrackingError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            if let Ok(mut calls) = self.calls.lock() {
                calls.push(call);
            }

            match self.behavior {
                Behavior::Record => Ok(RecordOutcome::Recorded),
                Behavior::Reject(status) => Ok(RecordOutcome::Rejected { status }),
                Behavior::Fail => Err(TrackingError::StoreRecordingFailure(
                    "Mock store client error".to_string(),
                )),
            }
        }
    }

    #[async_trait::async_trait]
    impl StoreClientTrait for MockStoreClient {
        async fn record_open(&self, message_id: &str) -> Result<RecordOutcome, TrackingError> {
            self.observe(RecordedCall::Open {
                message_id: message_id.to_string(),
            })
        }

        async fn record_click(
            &self,
            message_id: &str,
            destination: &str,
        ) -> Result<RecordOutcome, TrackingError> {
            self.observe(RecordedCall::Click {
                message_id: message_id.to_string(),
                destination: destination.to_string(),
            })
        }
    }

}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> StoreClient {
        StoreClient::new(
            server.uri(),
            SecretString::from("service-key"),
            Duration::from_secs(2),
        )
        .unwrap()
    }

    #[test]
    fn test_rpc_url_trims_trailing_slash() {
        let client = StoreClient::new(
            "https://project.supabase.co/".to_string(),
            SecretString::from("k"),
            Duration::from_secs(1),
        )
        .unwrap();

        assert_eq!(
            client.rpc_url(RECORD_OPEN_RPC),
            "https://project.supabase.co/rest/v1/rpc/track_email_open"
        );
    }

    #[tokio::test]
    async fn test_record_open_sends_rpc() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/rpc/track_email_open"))
            .and(header("apikey", "service-key"))
            .and(header("Authorization", "Bearer service-key"))
            .and(body_json(serde_json::json!({"p_provider_message_id": "msg-1"})))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = client_for(&server).record_open("msg-1").await.unwrap();
        assert_eq!(outcome, RecordOutcome::Recorded);
    }

    #[tokio::test]
    async fn test_record_click_sends_rpc() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/rpc/track_email_click"))
            .and(body_json(serde_json::json!({
                "p_provider_message_id": "msg-1",
                "p_link_url": "https://example.com/page?x=1"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!(null)))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = client_for(&server)
            .record_click("msg-1", "https://example.com/page?x=1")
            .await
            .unwrap();
        assert_eq!(outcome, RecordOutcome::Recorded);
    }

    #[tokio::test]
    async fn test_error_status_is_a_rejection_not_a_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/rpc/track_email_open"))
            .respond_with(ResponseTemplate::new(404).set_body_string("function not found"))
            .mount(&server)
            .await;

        let outcome = client_for(&server).record_open("msg-1").await.unwrap();
        assert_eq!(outcome, RecordOutcome::Rejected { status: 404 });
    }

    #[tokio::test]
    async fn test_unreachable_store_is_a_failure() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let closed_addr = listener.local_addr().unwrap();
        drop(listener);

        let client = StoreClient::new(
            format!("http://{}", closed_addr),
            SecretString::from("k"),
            Duration::from_secs(1),
        )
        .unwrap();

        let result = client.record_open("msg-1").await;
        assert!(matches!(
            result,
            Err(TrackingError::StoreRecordingFailure(_))
        ));
    }
}
