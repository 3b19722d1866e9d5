//! API Handlers
//!
//! HTTP request handlers for each cache server endpoint.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde_json::Value;

use super::state::PolicyCache;
use crate::backing::MemoryBackingStore;
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::{
    ClearResponse, GetResponse, HealthResponse, InvalidateQuery, InvalidateResponse,
    PatternInvalidateResponse, SetRequest, SetResponse, StatsResponse,
};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// The configured policy
    pub cache: PolicyCache,
    /// Document store behind the write-through and write-behind policies
    pub backing: Arc<MemoryBackingStore<Value>>,
}

impl AppState {
    pub fn new(cache: PolicyCache, backing: Arc<MemoryBackingStore<Value>>) -> Self {
        Self { cache, backing }
    }

    /// Creates a new AppState from configuration over an empty backing store.
    pub async fn from_config(config: &Config) -> Self {
        let backing = Arc::new(MemoryBackingStore::new());
        let cache = PolicyCache::from_config(config, backing.clone()).await;
        Self::new(cache, backing)
    }
}

/// Handler for PUT /set
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    state
        .cache
        .set(req.key.clone(), req.value, &req.dependencies)
        .await?;

    Ok(Json(SetResponse::new(req.key)))
}

/// Handler for GET /get/:key
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    match state.cache.get(&key).await? {
        Some(value) => Ok(Json(GetResponse::new(key, value))),
        None => Err(CacheError::NotFound(key)),
    }
}

/// Handler for DELETE /del/:key
///
/// Under the dependency policy this also drops the key's direct dependents.
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Json<InvalidateResponse> {
    let removed = state.cache.invalidate(&key).await;
    Json(InvalidateResponse::new(key, removed))
}

/// Handler for DELETE /invalidate?pattern=...
pub async fn invalidate_pattern_handler(
    State(state): State<AppState>,
    Query(query): Query<InvalidateQuery>,
) -> Result<Json<PatternInvalidateResponse>> {
    let removed = state.cache.invalidate_pattern(&query.pattern).await?;

    Ok(Json(PatternInvalidateResponse {
        pattern: query.pattern,
        removed,
    }))
}

/// Handler for POST /clear
pub async fn clear_handler(State(state): State<AppState>) -> Json<ClearResponse> {
    let removed = state.cache.clear().await;
    Json(ClearResponse { removed })
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let stats = state.cache.stats().await;
    let pending = state.cache.pending_writes().await;

    Json(StatsResponse::new(state.cache.policy(), stats, pending))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
