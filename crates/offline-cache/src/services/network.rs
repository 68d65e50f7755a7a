//! Network access for the worker.
//!
//! [`HttpFetcher`] forwards requests to the configured origin. Redirects are
//! passed back to the caller unfollowed, and any status, error statuses
//! included, is a successful fetch. Only a transport failure (connect error,
//! timeout, truncated body) is `NetworkUnavailable`.
//!
//! `Accept-Encoding` is not forwarded, so origin bodies arrive
//! identity-encoded and can be replayed to any client.

use crate::errors::CacheError;
use crate::models::{strip_hop_by_hop, FetchRequest, FetchResponse};
use axum::http::header;
use reqwest::{redirect, Client, Url};
use std::time::Duration;
use tracing::{debug, error, instrument};

/// Default connect timeout in seconds.
const ORIGIN_CONNECT_TIMEOUT_SECS: u64 = 5;

/// Trait for network fetches (enables mocking).
#[async_trait::async_trait]
pub trait NetworkFetcher: Send + Sync {
    /// Fetch `request` from the network.
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, CacheError>;
}

/// Fetches from a single origin over HTTP.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
    origin: Url,
}

impl HttpFetcher {
    /// Create a fetcher for `origin_url`.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::InvalidRequest` if the origin is not a valid URL
    /// and `CacheError::Internal` if the HTTP client cannot be built.
    pub fn new(origin_url: &str, timeout: Duration) -> Result<Self, CacheError> {
        let origin = Url::parse(origin_url)
            .map_err(|e| CacheError::InvalidRequest(format!("origin '{}': {}", origin_url, e)))?;

        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(ORIGIN_CONNECT_TIMEOUT_SECS))
            .redirect(redirect::Policy::none())
            .build()
            .map_err(|e| {
                error!(target: "offline_cache.services.network", error = %e, "Failed to build HTTP client");
                CacheError::Internal
            })?;

        Ok(Self { client, origin })
    }

    /// Resolve a path-and-query against the origin.
    ///
    /// Protocol-relative paths (`//other.host/x`) would leave the origin and
    /// are rejected.
    fn resolve(&self, url: &str) -> Result<Url, CacheError> {
        let resolved = self
            .origin
            .join(url)
            .map_err(|e| CacheError::InvalidRequest(format!("url '{}': {}", url, e)))?;

        if resolved.origin() != self.origin.origin() {
            return Err(CacheError::InvalidRequest(format!(
                "url '{}' leaves the origin",
                url
            )));
        }

        Ok(resolved)
    }
}

#[async_trait::async_trait]
impl NetworkFetcher for HttpFetcher {
    #[instrument(skip_all, name = "offline_cache.network.fetch", fields(method = %request.method, url = %request.url))]
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, CacheError> {
        let url = self.resolve(&request.url)?;

        let mut headers = request.headers.clone();
        strip_hop_by_hop(&mut headers);
        headers.remove(header::ACCEPT_ENCODING);

        let response = self
            .client
            .request(request.method.clone(), url)
            .headers(headers)
            .body(request.body.clone())
            .send()
            .await
            .map_err(|e| {
                debug!(target: "offline_cache.services.network", error = %e, "Origin request failed");
                CacheError::NetworkUnavailable(e.to_string())
            })?;

        let status = response.status();
        let mut headers = response.headers().clone();
        strip_hop_by_hop(&mut headers);

        let body = response.bytes().await.map_err(|e| {
            debug!(target: "offline_cache.services.network", error = %e, "Origin body read failed");
            CacheError::NetworkUnavailable(e.to_string())
        })?;

        debug!(target: "offline_cache.services.network", status = %status, bytes = body.len(), "Origin responded");

        Ok(FetchResponse {
            status,
            headers,
            body,
        })
    }
}

/// Mock fetcher module for testing.
///
/// This module provides a mock implementation of the network for use in tests.
pub mod mock {

    use super::*;
    use axum::http::StatusCode;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Mock network for unit testing.
    ///
    /// Serves canned responses by URL; unknown URLs answer 404. While
    /// offline, every fetch fails with `NetworkUnavailable`.
    #[derive(Default)]
    pub struct MockFetcher {
        responses: Mutex<HashMap<String, FetchResponse>>,
        offline: AtomicBool,
        /// Number of fetches made.
        call_count: AtomicUsize,
        /// URLs fetched, in arrival order.
        calls: Mutex<Vec<String>>,
    }

    impl MockFetcher {
        pub fn new() -> Self {
            Self::default()
        }

        /// Serve `status` and `body` for `url`.
        pub fn with_response(self, url: &str, status: StatusCode, body: &str) -> Self {
            self.set_response(url, FetchResponse::new(status, body.to_string()));
            self
        }

        /// Replace the canned response for `url`.
        pub fn set_response(&self, url: &str, response: FetchResponse) {
            if let Ok(mut responses) = self.responses.lock() {
                responses.insert(url.to_string(), response);
            }
        }

        /// Toggle whether fetches fail at the transport level.
        pub fn set_offline(&self, offline: bool) {
            self.offline.store(offline, Ordering::SeqCst);
        }

        /// Get the number of fetches made.
        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }

        /// Get the URLs fetched so far.
        pub fn calls(&self) -> Vec<String> {
            self.calls
                .lock()
                .map(|calls| calls.clone())
                .unwrap_or_default()
        }
    }

    #[async_trait::async_trait]
    impl NetworkFetcher for MockFetcher {
        async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, CacheError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            if let Ok(mut calls) = self.calls.lock() {
                calls.push(request.url.clone());
            }

            if self.offline.load(Ordering::SeqCst) {
                return Err(CacheError::NetworkUnavailable(
                    "Mock network offline".to_string(),
                ));
            }

            let canned = self
                .responses
                .lock()
                .ok()
                .and_then(|responses| responses.get(&request.url).cloned());

            Ok(canned.unwrap_or_else(|| FetchResponse::new(StatusCode::NOT_FOUND, "Not Found")))
        }
    }

    #[cfg(test)]
    #[allow(clippy::unwrap_used, clippy::expect_used)]
    mod tests {
        use super::*;

        #[tokio::test]
        async fn test_mock_serves_canned_and_404() {
            let mock = MockFetcher::new().with_response("/", StatusCode::OK, "<html>");

            let hit = mock.fetch(&FetchRequest::get("/")).await.unwrap();
            let miss = mock.fetch(&FetchRequest::get("/nope")).await.unwrap();

            assert_eq!(hit.status, StatusCode::OK);
            assert_eq!(hit.body.as_ref(), b"<html>");
            assert_eq!(miss.status, StatusCode::NOT_FOUND);
            assert_eq!(mock.calls(), vec!["/", "/nope"]);
        }

        #[tokio::test]
        async fn test_mock_offline() {
            let mock = MockFetcher::new().with_response("/", StatusCode::OK, "<html>");
            mock.set_offline(true);

            let result = mock.fetch(&FetchRequest::get("/")).await;

            assert!(matches!(result, Err(CacheError::NetworkUnavailable(_))));
            assert_eq!(mock.call_count(), 1);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::http::{Method, StatusCode};
    use wiremock::matchers::{body_string, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher_for(server: &MockServer) -> HttpFetcher {
        HttpFetcher::new(&server.uri(), Duration::from_secs(2)).unwrap()
    }

    #[test]
    fn test_invalid_origin_is_rejected() {
        let result = HttpFetcher::new("not a url", Duration::from_secs(1));
        assert!(matches!(result, Err(CacheError::InvalidRequest(_))));
    }

    #[test]
    fn test_resolve_stays_on_origin() {
        let fetcher =
            HttpFetcher::new("https://hub.untrapd.com", Duration::from_secs(1)).unwrap();

        assert_eq!(
            fetcher.resolve("/index.html?a=1").unwrap().as_str(),
            "https://hub.untrapd.com/index.html?a=1"
        );
        assert!(matches!(
            fetcher.resolve("//evil.test/steal"),
            Err(CacheError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_resolves_path_and_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/styles.css"))
            .and(query_param("v", "2"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/css")
                    .set_body_raw("body{}", "text/css"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let response = fetcher_for(&server)
            .fetch(&FetchRequest::get("/styles.css?v=2"))
            .await
            .unwrap();

        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.headers.get("content-type").unwrap(), "text/css");
        assert_eq!(response.body.as_ref(), b"body{}");
    }

    #[tokio::test]
    async fn test_fetch_forwards_method_headers_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/subscribe"))
            .and(header("x-client", "landing"))
            .and(body_string("email=a@b.test"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let mut request = FetchRequest::get("/api/subscribe").with_method(Method::POST);
        request
            .headers
            .insert("x-client", "landing".parse().unwrap());
        request.body = "email=a@b.test".into();

        let response = fetcher_for(&server).fetch(&request).await.unwrap();
        assert_eq!(response.status, StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_accept_encoding_is_not_forwarded() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/script.js"))
            .and(|request: &wiremock::Request| {
                !request.headers.contains_key("accept-encoding")
            })
            .respond_with(ResponseTemplate::new(200).set_body_string("run()"))
            .expect(1)
            .mount(&server)
            .await;

        let mut request = FetchRequest::get("/script.js");
        request
            .headers
            .insert("accept-encoding", "gzip, br".parse().unwrap());

        let response = fetcher_for(&server).fetch(&request).await.unwrap();

        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body.as_ref(), b"run()");
    }

    #[tokio::test]
    async fn test_redirects_are_not_followed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/old"))
            .respond_with(ResponseTemplate::new(301).insert_header("location", "/new"))
            .mount(&server)
            .await;

        let response = fetcher_for(&server)
            .fetch(&FetchRequest::get("/old"))
            .await
            .unwrap();

        assert_eq!(response.status, StatusCode::MOVED_PERMANENTLY);
        assert_eq!(response.headers.get("location").unwrap(), "/new");
    }

    #[tokio::test]
    async fn test_error_status_is_a_response_not_a_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let response = fetcher_for(&server)
            .fetch(&FetchRequest::get("/"))
            .await
            .unwrap();

        assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_unreachable_origin_is_network_unavailable() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let closed_addr = listener.local_addr().unwrap();
        drop(listener);

        let fetcher =
            HttpFetcher::new(&format!("http://{}", closed_addr), Duration::from_secs(1)).unwrap();

        let result = fetcher.fetch(&FetchRequest::get("/")).await;
        assert!(matches!(result, Err(CacheError::NetworkUnavailable(_))));
    }
}
