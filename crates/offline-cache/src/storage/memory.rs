//! In-process cache storage.
//!
//! Namespaces live in a `BTreeMap` behind a single `RwLock`, so `put_all`
//! is atomic with respect to concurrent lookups and `keys()` is ordered.

use super::CacheStorage;
use crate::errors::CacheError;
use crate::models::{FetchResponse, RequestKey};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

type Namespace = HashMap<RequestKey, FetchResponse>;

/// Cache storage held in memory for the lifetime of the process.
#[derive(Default)]
pub struct InMemoryCacheStorage {
    namespaces: RwLock<BTreeMap<String, Namespace>>,
}

impl InMemoryCacheStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries in `namespace`, or `None` if it does not exist.
    pub async fn entry_count(&self, namespace: &str) -> Option<usize> {
        self.namespaces.read().await.get(namespace).map(HashMap::len)
    }
}

#[async_trait::async_trait]
impl CacheStorage for InMemoryCacheStorage {
    async fn open(&self, namespace: &str) -> Result<(), CacheError> {
        self.namespaces
            .write()
            .await
            .entry(namespace.to_string())
            .or_default();
        Ok(())
    }

    async fn lookup(
        &self,
        namespace: &str,
        key: &RequestKey,
    ) -> Result<Option<FetchResponse>, CacheError> {
        Ok(self
            .namespaces
            .read()
            .await
            .get(namespace)
            .and_then(|entries| entries.get(key))
            .cloned())
    }

    async fn put(
        &self,
        namespace: &str,
        key: RequestKey,
        response: FetchResponse,
    ) -> Result<(), CacheError> {
        self.namespaces
            .write()
            .await
            .entry(namespace.to_string())
            .or_default()
            .insert(key, response);
        Ok(())
    }

    async fn put_all(
        &self,
        namespace: &str,
        entries: Vec<(RequestKey, FetchResponse)>,
    ) -> Result<(), CacheError> {
        let mut namespaces = self.namespaces.write().await;
        namespaces
            .entry(namespace.to_string())
            .or_default()
            .extend(entries);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, CacheError> {
        Ok(self.namespaces.read().await.keys().cloned().collect())
    }

    async fn delete(&self, namespace: &str) -> Result<bool, CacheError> {
        Ok(self.namespaces.write().await.remove(namespace).is_some())
    }

    async fn size(&self) -> Result<u64, CacheError> {
        Ok(self
            .namespaces
            .read()
            .await
            .values()
            .flat_map(HashMap::values)
            .map(FetchResponse::size)
            .sum())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn ok(body: &'static str) -> FetchResponse {
        FetchResponse::new(StatusCode::OK, body)
    }

    #[tokio::test]
    async fn test_open_creates_empty_namespace() {
        let storage = InMemoryCacheStorage::new();
        storage.open("v1").await.unwrap();
        storage.open("v1").await.unwrap();

        assert_eq!(storage.keys().await.unwrap(), vec!["v1"]);
        assert_eq!(storage.entry_count("v1").await, Some(0));
    }

    #[tokio::test]
    async fn test_put_then_lookup() {
        let storage = InMemoryCacheStorage::new();
        storage
            .put("v1", RequestKey::get("/a.css"), ok("body{}"))
            .await
            .unwrap();

        let hit = storage
            .lookup("v1", &RequestKey::get("/a.css"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(hit.body.as_ref(), b"body{}");

        // Same URL, different namespace
        assert!(storage
            .lookup("v2", &RequestKey::get("/a.css"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_put_replaces_existing_entry() {
        let storage = InMemoryCacheStorage::new();
        storage.put("v1", RequestKey::get("/"), ok("old")).await.unwrap();
        storage.put("v1", RequestKey::get("/"), ok("new")).await.unwrap();

        let hit = storage
            .lookup("v1", &RequestKey::get("/"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(hit.body.as_ref(), b"new");
        assert_eq!(storage.entry_count("v1").await, Some(1));
    }

    #[tokio::test]
    async fn test_keys_sorted_and_delete() {
        let storage = InMemoryCacheStorage::new();
        for name in ["v2", "v1", "v3"] {
            storage.open(name).await.unwrap();
        }

        assert_eq!(storage.keys().await.unwrap(), vec!["v1", "v2", "v3"]);
        assert!(storage.delete("v2").await.unwrap());
        assert!(!storage.delete("v2").await.unwrap());
        assert_eq!(storage.keys().await.unwrap(), vec!["v1", "v3"]);
    }

    #[tokio::test]
    async fn test_size_sums_bodies_across_namespaces() {
        let storage = InMemoryCacheStorage::new();
        storage
            .put_all(
                "v1",
                vec![
                    (RequestKey::get("/"), ok("12345")),
                    (RequestKey::get("/x"), ok("123")),
                ],
            )
            .await
            .unwrap();
        storage.put("v2", RequestKey::get("/"), ok("12")).await.unwrap();

        assert_eq!(storage.size().await.unwrap(), 10);
    }
}
