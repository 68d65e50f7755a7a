//! Named, versioned cache namespaces.
//!
//! The worker only talks to [`CacheStorage`]; the proxy binary backs it with
//! [`InMemoryCacheStorage`].

use crate::errors::CacheError;
use crate::models::{FetchResponse, RequestKey};

pub mod memory;

pub use memory::InMemoryCacheStorage;

/// Trait for cache namespace operations (enables swapping the backing store).
#[async_trait::async_trait]
pub trait CacheStorage: Send + Sync {
    /// Open `namespace`, creating it empty if absent.
    async fn open(&self, namespace: &str) -> Result<(), CacheError>;

    /// Look up `key` in `namespace`. A missing namespace is a miss.
    async fn lookup(
        &self,
        namespace: &str,
        key: &RequestKey,
    ) -> Result<Option<FetchResponse>, CacheError>;

    /// Store one entry, replacing any previous entry for `key`.
    async fn put(
        &self,
        namespace: &str,
        key: RequestKey,
        response: FetchResponse,
    ) -> Result<(), CacheError>;

    /// Store every entry or none of them.
    async fn put_all(
        &self,
        namespace: &str,
        entries: Vec<(RequestKey, FetchResponse)>,
    ) -> Result<(), CacheError>;

    /// Names of every namespace, in ascending order.
    async fn keys(&self) -> Result<Vec<String>, CacheError>;

    /// Delete `namespace`. Returns whether it existed.
    async fn delete(&self, namespace: &str) -> Result<bool, CacheError>;

    /// Total stored body bytes across all namespaces.
    async fn size(&self) -> Result<u64, CacheError>;
}
