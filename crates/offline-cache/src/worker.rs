//! Offline cache worker.
//!
//! Lifecycle:
//!
//! ```text
//! Parsed -> Installing -> Installed -> Activating -> Activated
//!               |
//!               +-> Redundant (precache failed)
//! ```
//!
//! - `install` precaches the app shell into the namespace named by the cache
//!   version. Every path is fetched; if any fetch fails or answers non-2xx,
//!   nothing is stored.
//! - `activate` deletes every other namespace. Stale namespaces are only
//!   ever purged here, never while serving.
//! - `fetch` serves cache-first from the live namespace. Only `GET`
//!   responses with status exactly 200 are stored. When the network is down,
//!   navigations get the cached fallback document (or a built-in offline
//!   page); everything else gets `NetworkUnavailable`.
//!
//! The cache is shared by every client of the proxy:
//!
//! - Credentialed requests (`Cookie`, `Authorization`) go straight to the
//!   network and are never stored. They read the cache only once the
//!   network has failed.
//! - Client-specific responses (`Set-Cookie`, `Cache-Control: private` or
//!   `no-store`, `Vary: *`) are served but not stored.
//! - Once stored bytes reach `max_cache_bytes`, misses are served but not
//!   stored. Nothing is evicted.
//!
//! Concurrent identical misses each fetch and each store; the last write
//! wins. Concurrent stores may overshoot the byte limit by one response
//! each.

use crate::config::WorkerConfig;
use crate::errors::CacheError;
use crate::models::{FetchRequest, FetchResponse, RequestKey, ResponseSource, WorkerPhase};
use crate::observability::metrics::{
    record_install, record_lookup, record_namespaces_purged, record_network_fetch,
    record_store_skipped,
};
use crate::services::NetworkFetcher;
use crate::storage::CacheStorage;
use axum::http::{header, HeaderValue, Method, StatusCode};
use futures::future::try_join_all;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

/// Served to navigations while offline when no fallback document is cached.
pub const OFFLINE_PAGE_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>Offline</title>
  <style>
    body { font-family: system-ui, sans-serif; text-align: center; padding: 3rem 1rem; color: #1f2937; }
    h1 { font-size: 1.75rem; }
  </style>
</head>
<body>
  <h1>You're Offline</h1>
  <p>This page isn't available offline yet. Check your connection and try again.</p>
</body>
</html>
"#;

/// Result of a successful install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    pub cache_version: String,
    /// Number of app-shell entries stored.
    pub cached_entries: usize,
    /// Total body bytes stored.
    pub cached_bytes: u64,
}

/// Result of a successful activation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationReport {
    pub cache_version: String,
    /// Namespaces deleted, in storage order.
    pub deleted: Vec<String>,
}

/// A served response and where it came from.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub response: FetchResponse,
    pub source: ResponseSource,
}

/// Cache-first request interceptor with a versioned namespace.
pub struct OfflineCacheWorker {
    config: WorkerConfig,
    storage: Arc<dyn CacheStorage>,
    network: Arc<dyn NetworkFetcher>,
    phase: RwLock<WorkerPhase>,
}

impl OfflineCacheWorker {
    pub fn new(
        config: WorkerConfig,
        storage: Arc<dyn CacheStorage>,
        network: Arc<dyn NetworkFetcher>,
    ) -> Self {
        Self {
            config,
            storage,
            network,
            phase: RwLock::new(WorkerPhase::Parsed),
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub async fn phase(&self) -> WorkerPhase {
        *self.phase.read().await
    }

    /// Precache the app shell into the current namespace.
    ///
    /// # Errors
    ///
    /// - `InvalidPhase` unless the worker is `Parsed`
    /// - `AssetPrecacheFailure` if any path cannot be fetched or answers
    ///   non-2xx; the worker becomes `Redundant`
    #[instrument(skip_all, name = "offline_cache.worker.install", fields(cache_version = %self.config.cache_version))]
    pub async fn install(&self) -> Result<InstallReport, CacheError> {
        self.transition("install", WorkerPhase::Parsed, WorkerPhase::Installing).await?;

        let result = self.precache().await;
        record_install(result.is_ok());

        match &result {
            Ok(report) => {
                info!(
                    target: "offline_cache.worker",
                    entries = report.cached_entries,
                    bytes = report.cached_bytes,
                    "App shell cached"
                );
                self.set_phase(WorkerPhase::Installed).await;
            }
            Err(e) => {
                warn!(target: "offline_cache.worker", error = %e, "Install failed");
                self.set_phase(WorkerPhase::Redundant).await;
            }
        }

        result
    }

    async fn precache(&self) -> Result<InstallReport, CacheError> {
        let namespace = self.config.cache_version.as_str();
        self.storage.open(namespace).await?;

        let fetches = self.config.app_shell.iter().map(|path| async move {
            let request = FetchRequest::get(path.as_str());
            let response = self.network.fetch(&request).await.map_err(|e| {
                record_network_fetch(None);
                CacheError::AssetPrecacheFailure {
                    path: path.clone(),
                    reason: e.to_string(),
                }
            })?;
            record_network_fetch(Some(response.status.as_u16()));

            if !response.status.is_success() {
                return Err(CacheError::AssetPrecacheFailure {
                    path: path.clone(),
                    reason: format!("status {}", response.status.as_u16()),
                });
            }

            Ok((request.key(), response))
        });

        let entries = try_join_all(fetches).await?;
        let cached_entries = entries.len();
        let cached_bytes = entries.iter().map(|(_, response)| response.size()).sum();

        self.storage.put_all(namespace, entries).await?;

        Ok(InstallReport {
            cache_version: self.config.cache_version.clone(),
            cached_entries,
            cached_bytes,
        })
    }

    /// Delete every namespace other than the current one and start serving.
    ///
    /// # Errors
    ///
    /// - `InvalidPhase` unless the worker is `Installed`
    /// - `Storage` if a namespace cannot be listed or deleted; the worker
    ///   returns to `Installed`
    #[instrument(skip_all, name = "offline_cache.worker.activate", fields(cache_version = %self.config.cache_version))]
    pub async fn activate(&self) -> Result<ActivationReport, CacheError> {
        self.transition("activate", WorkerPhase::Installed, WorkerPhase::Activating).await?;

        match self.purge_stale_namespaces().await {
            Ok(deleted) => {
                self.set_phase(WorkerPhase::Activated).await;
                info!(
                    target: "offline_cache.worker",
                    deleted = deleted.len(),
                    "Worker activated, claiming clients"
                );
                Ok(ActivationReport {
                    cache_version: self.config.cache_version.clone(),
                    deleted,
                })
            }
            Err(e) => {
                warn!(target: "offline_cache.worker", error = %e, "Activation failed");
                self.set_phase(WorkerPhase::Installed).await;
                Err(e)
            }
        }
    }

    async fn purge_stale_namespaces(&self) -> Result<Vec<String>, CacheError> {
        let mut deleted = Vec::new();

        for namespace in self.storage.keys().await? {
            if namespace == self.config.cache_version {
                continue;
            }

            info!(target: "offline_cache.worker", namespace = %namespace, "Deleting old cache");
            if self.storage.delete(&namespace).await? {
                deleted.push(namespace);
            }
        }

        record_namespaces_purged(deleted.len());
        Ok(deleted)
    }

    /// Serve an intercepted request.
    ///
    /// # Errors
    ///
    /// - `NotActivated` unless the worker is `Activated`
    /// - `NetworkUnavailable` for an uncached non-navigational request whose
    ///   network fetch failed
    /// - `Storage` if the cache cannot be read
    #[instrument(skip_all, name = "offline_cache.worker.fetch", fields(method = %request.method, url = %request.url))]
    pub async fn fetch(&self, request: &FetchRequest) -> Result<FetchOutcome, CacheError> {
        let phase = self.phase().await;
        if phase != WorkerPhase::Activated {
            return Err(CacheError::NotActivated(phase));
        }

        let namespace = self.config.cache_version.as_str();
        let is_get = request.method == Method::GET;
        let shared = is_get && !request.is_credentialed();

        if shared {
            if let Some(response) = self.storage.lookup(namespace, &request.key()).await? {
                return Ok(self.served(response, ResponseSource::Cache));
            }
        }

        match self.network.fetch(request).await {
            Ok(response) => {
                record_network_fetch(Some(response.status.as_u16()));

                if shared && response.status == StatusCode::OK {
                    self.store(namespace, request.key(), &response).await;
                }

                Ok(self.served(response, ResponseSource::Network))
            }
            Err(e) => {
                record_network_fetch(None);

                // Credentialed requests skipped the lookup above
                if is_get && !shared {
                    if let Some(response) = self.storage.lookup(namespace, &request.key()).await? {
                        return Ok(self.served(response, ResponseSource::Cache));
                    }
                }

                if !request.destination.is_navigational() {
                    debug!(target: "offline_cache.worker", error = %e, "Network fetch failed");
                    return Err(e);
                }

                warn!(target: "offline_cache.worker", error = %e, "Navigation failed, serving offline fallback");
                let fallback_key = RequestKey::get(self.config.fallback_document.as_str());
                match self.storage.lookup(namespace, &fallback_key).await? {
                    Some(response) => Ok(self.served(response, ResponseSource::Fallback)),
                    None => Ok(self.served(offline_page(), ResponseSource::OfflinePage)),
                }
            }
        }
    }

    /// Store a fresh 200 response unless it is client-specific or the cache
    /// is full. Failures are logged; the response is served either way.
    async fn store(&self, namespace: &str, key: RequestKey, response: &FetchResponse) {
        if !response.is_shareable() {
            debug!(target: "offline_cache.worker", url = %key.url, "Client-specific response, not caching");
            record_store_skipped("private");
            return;
        }

        let stored = match self.storage.size().await {
            Ok(stored) => stored,
            Err(e) => {
                warn!(target: "offline_cache.worker", error = %e, "Failed to read cache size");
                return;
            }
        };

        if stored.saturating_add(response.size()) > self.config.max_cache_bytes {
            warn!(
                target: "offline_cache.worker",
                url = %key.url,
                stored,
                limit = self.config.max_cache_bytes,
                "Cache full, not caching response"
            );
            record_store_skipped("capacity");
            return;
        }

        if let Err(e) = self.storage.put(namespace, key, response.clone()).await {
            warn!(target: "offline_cache.worker", error = %e, "Failed to cache response");
        }
    }

    /// Delete every namespace, the live one included.
    ///
    /// Later misses repopulate the live namespace from the network.
    pub async fn clear_all(&self) -> Result<Vec<String>, CacheError> {
        let mut deleted = Vec::new();
        for namespace in self.storage.keys().await? {
            if self.storage.delete(&namespace).await? {
                deleted.push(namespace);
            }
        }

        info!(target: "offline_cache.worker", deleted = deleted.len(), "Cleared all caches");
        record_namespaces_purged(deleted.len());
        Ok(deleted)
    }

    /// Total stored body bytes across every namespace.
    pub async fn cache_size(&self) -> Result<u64, CacheError> {
        self.storage.size().await
    }

    fn served(&self, response: FetchResponse, source: ResponseSource) -> FetchOutcome {
        debug!(target: "offline_cache.worker", source = source.lookup_label(), status = %response.status, "Serving response");
        record_lookup(source.lookup_label());
        FetchOutcome { response, source }
    }

    async fn transition(
        &self,
        operation: &'static str,
        from: WorkerPhase,
        to: WorkerPhase,
    ) -> Result<(), CacheError> {
        let mut phase = self.phase.write().await;
        if *phase != from {
            return Err(CacheError::InvalidPhase {
                operation,
                phase: *phase,
            });
        }
        *phase = to;
        Ok(())
    }

    async fn set_phase(&self, phase: WorkerPhase) {
        *self.phase.write().await = phase;
    }
}

fn offline_page() -> FetchResponse {
    FetchResponse::new(StatusCode::OK, OFFLINE_PAGE_HTML).with_header(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/html; charset=utf-8"),
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::services::MockFetcher;
    use crate::storage::InMemoryCacheStorage;

    fn worker_with(network: Arc<MockFetcher>) -> OfflineCacheWorker {
        OfflineCacheWorker::new(
            WorkerConfig::new("v1", &["/", "/index.html"]),
            Arc::new(InMemoryCacheStorage::new()),
            network,
        )
    }

    fn shell_network() -> Arc<MockFetcher> {
        Arc::new(
            MockFetcher::new()
                .with_response("/", StatusCode::OK, "<html>root</html>")
                .with_response("/index.html", StatusCode::OK, "<html>index</html>"),
        )
    }

    #[tokio::test]
    async fn test_new_worker_is_parsed() {
        let worker = worker_with(shell_network());
        assert_eq!(worker.phase().await, WorkerPhase::Parsed);
    }

    #[tokio::test]
    async fn test_install_reports_entries_and_bytes() {
        let worker = worker_with(shell_network());

        let report = worker.install().await.unwrap();

        assert_eq!(report.cache_version, "v1");
        assert_eq!(report.cached_entries, 2);
        assert_eq!(report.cached_bytes, 35);
        assert_eq!(worker.phase().await, WorkerPhase::Installed);
        assert_eq!(worker.cache_size().await.unwrap(), 35);
    }

    #[tokio::test]
    async fn test_install_twice_is_invalid() {
        let worker = worker_with(shell_network());
        worker.install().await.unwrap();

        let result = worker.install().await;
        assert!(matches!(
            result,
            Err(CacheError::InvalidPhase {
                operation: "install",
                phase: WorkerPhase::Installed
            })
        ));
    }

    #[tokio::test]
    async fn test_activate_before_install_is_invalid() {
        let worker = worker_with(shell_network());

        let result = worker.activate().await;
        assert!(matches!(
            result,
            Err(CacheError::InvalidPhase {
                operation: "activate",
                phase: WorkerPhase::Parsed
            })
        ));
    }

    #[tokio::test]
    async fn test_failed_install_makes_worker_redundant() {
        let network = Arc::new(MockFetcher::new().with_response("/", StatusCode::OK, "ok"));
        let worker = worker_with(network);

        let result = worker.install().await;

        assert!(
            matches!(result, Err(CacheError::AssetPrecacheFailure { ref path, .. }) if path == "/index.html")
        );
        assert_eq!(worker.phase().await, WorkerPhase::Redundant);
        assert_eq!(worker.cache_size().await.unwrap(), 0);
        assert!(matches!(
            worker.activate().await,
            Err(CacheError::InvalidPhase { .. })
        ));
    }

    #[tokio::test]
    async fn test_install_offline_fails() {
        let network = shell_network();
        network.set_offline(true);
        let worker = worker_with(network);

        let result = worker.install().await;
        assert!(matches!(
            result,
            Err(CacheError::AssetPrecacheFailure { .. })
        ));
    }

    #[tokio::test]
    async fn test_non_get_bypasses_cache() {
        let network = shell_network();
        network.set_response("/api", FetchResponse::new(StatusCode::OK, "created"));
        let worker = worker_with(network.clone());
        worker.install().await.unwrap();
        worker.activate().await.unwrap();
        let calls_after_install = network.call_count();

        let post = FetchRequest::get("/api").with_method(Method::POST);
        for _ in 0..2 {
            let outcome = worker.fetch(&post).await.unwrap();
            assert_eq!(outcome.source, ResponseSource::Network);
        }

        assert_eq!(network.call_count(), calls_after_install + 2);
        assert_eq!(worker.cache_size().await.unwrap(), 35);
    }

    #[tokio::test]
    async fn test_offline_navigation_without_fallback_gets_offline_page() {
        let network = Arc::new(MockFetcher::new().with_response("/", StatusCode::OK, "root"));
        let worker = OfflineCacheWorker::new(
            WorkerConfig::new("v1", &["/"]),
            Arc::new(InMemoryCacheStorage::new()),
            network.clone(),
        );
        worker.install().await.unwrap();
        worker.activate().await.unwrap();
        network.set_offline(true);

        let outcome = worker.fetch(&FetchRequest::navigation("/about")).await.unwrap();

        assert_eq!(outcome.source, ResponseSource::OfflinePage);
        assert_eq!(outcome.response.status, StatusCode::OK);
        assert_eq!(
            outcome.response.headers.get(header::CONTENT_TYPE).unwrap(),
            "text/html; charset=utf-8"
        );
        assert!(String::from_utf8_lossy(&outcome.response.body).contains("You're Offline"));
    }

    #[tokio::test]
    async fn test_clear_all_deletes_live_namespace() {
        let network = shell_network();
        let worker = worker_with(network.clone());
        worker.install().await.unwrap();
        worker.activate().await.unwrap();

        let deleted = worker.clear_all().await.unwrap();

        assert_eq!(deleted, vec!["v1"]);
        assert_eq!(worker.cache_size().await.unwrap(), 0);

        // Next request misses and repopulates
        let before = network.call_count();
        let outcome = worker.fetch(&FetchRequest::get("/")).await.unwrap();
        assert_eq!(outcome.source, ResponseSource::Network);
        assert_eq!(network.call_count(), before + 1);
        assert_eq!(worker.cache_size().await.unwrap(), 17);
    }
}
