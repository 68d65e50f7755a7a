//! Cache maintenance endpoints.
//!
//! - `GET /__offline-cache/size` reports total stored body bytes
//! - `POST /__offline-cache/clear` deletes every namespace

use crate::errors::CacheError;
use crate::routes::AppState;
use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;

#[derive(Debug, Serialize)]
pub struct CacheSizeResponse {
    pub size: u64,
}

#[derive(Debug, Serialize)]
pub struct ClearCacheResponse {
    pub deleted: Vec<String>,
}

/// Handler for GET /__offline-cache/size
#[instrument(skip_all, name = "offline_cache.maintenance.size")]
pub async fn cache_size(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CacheSizeResponse>, CacheError> {
    let size = state.worker.cache_size().await?;
    Ok(Json(CacheSizeResponse { size }))
}

/// Handler for POST /__offline-cache/clear
#[instrument(skip_all, name = "offline_cache.maintenance.clear")]
pub async fn clear_cache(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ClearCacheResponse>, CacheError> {
    let deleted = state.worker.clear_all().await?;
    Ok(Json(ClearCacheResponse { deleted }))
}
