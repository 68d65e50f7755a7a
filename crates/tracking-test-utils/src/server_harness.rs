//! Test server harness for E2E testing
//!
//! Provides `TestTrackingServer` for spawning real tracking service instances
//! in tests.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use tokio::task::JoinHandle;
use tracking_service::config::Config;
use tracking_service::routes::{self, init_metrics_recorder, AppState};
use tracking_service::services::StoreClientTrait;

/// Global metrics handle shared by every test server in the process.
static TEST_METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Get the process-wide metrics handle, installing the recorder on first use.
///
/// Falls back to a detached recorder when another recorder is already
/// installed.
pub fn test_metrics_handle() -> PrometheusHandle {
    TEST_METRICS_HANDLE
        .get_or_init(|| {
            init_metrics_recorder()
                .unwrap_or_else(|_| PrometheusBuilder::new().build_recorder().handle())
        })
        .clone()
}

/// Test harness for spawning the tracking service in E2E tests.
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_health_e2e() -> anyhow::Result<()> {
///     let server = TestTrackingServer::spawn(Arc::new(MockStoreClient::recording())).await?;
///
///     let response = reqwest::get(format!("{}/health", server.url())).await?;
///
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestTrackingServer {
    addr: SocketAddr,
    config: Config,
    client: reqwest::Client,
    _handle: JoinHandle<()>,
}

impl TestTrackingServer {
    /// Spawn a new test server instance backed by `store`.
    ///
    /// The server will:
    /// - Bind to a random available port (127.0.0.1:0)
    /// - Start the HTTP server in the background
    ///
    /// # Returns
    /// * `Ok(TestTrackingServer)` - Running server instance
    /// * `Err(anyhow::Error)` - If server spawn fails
    pub async fn spawn(store: Arc<dyn StoreClientTrait>) -> Result<Self, anyhow::Error> {
        let vars = HashMap::from([
            (
                "SUPABASE_URL".to_string(),
                "http://store.invalid".to_string(),
            ),
            (
                "SUPABASE_SERVICE_KEY".to_string(),
                "test-service-key".to_string(),
            ),
            ("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
        ]);

        let config = Config::from_vars(&vars)
            .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?;

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        // Tracking links built by tests should point at this instance
        let mut config = config;
        config.public_base_url = format!("http://{}", addr);

        let state = Arc::new(AppState {
            config: config.clone(),
            store,
        });

        let app = routes::build_routes(state, test_metrics_handle());

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Test server error: {}", e);
            }
        });

        // Redirects must be observed, not followed
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build test client: {}", e))?;

        Ok(Self {
            addr,
            config,
            client,
            _handle: handle,
        })
    }

    /// Get the base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the socket address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get reference to the server configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// HTTP client that does not follow redirects.
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }
}

impl Drop for TestTrackingServer {
    fn drop(&mut self) {
        // Abort the HTTP server task so the port is released when the test ends.
        self._handle.abort();
    }
}
