//! Generic key/value cache endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::error;

use crate::handlers::store_error_response;
use crate::models::{AppState, CacheEntry, CacheLookup, CacheSetRequest, WriteOutcome};

/// PUT /api/cache/{key}
pub async fn put_entry(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    Json(request): Json<CacheSetRequest>,
) -> Result<Json<Value>, (StatusCode, String)> {
    let ttl = request.ttl_secs.map(Duration::from_secs);

    match state.cache.set(&key, &request.value, ttl).await {
        Ok(WriteOutcome::Written) => Ok(Json(json!({ "stored": true, "key": key }))),
        Ok(WriteOutcome::Unavailable) => Err((
            StatusCode::SERVICE_UNAVAILABLE,
            "cache component is unavailable".to_string(),
        )),
        Err(e) => {
            error!("❌ Cache write failed: {}", e);
            Err(store_error_response(e))
        }
    }
}

/// GET /api/cache/{key}
///
/// A miss is a 404; an unavailable store is a 503. The two are never the
/// same answer.
pub async fn get_entry(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<Json<CacheEntry>, (StatusCode, String)> {
    match state.cache.get(&key).await {
        Ok(CacheLookup::Hit(entry)) => Ok(Json(entry)),
        Ok(CacheLookup::Miss) => Err((
            StatusCode::NOT_FOUND,
            format!("no cache entry for key {}", key),
        )),
        Ok(CacheLookup::Unavailable) => Err((
            StatusCode::SERVICE_UNAVAILABLE,
            "cache component is unavailable".to_string(),
        )),
        Err(e) => {
            error!("❌ Cache read failed: {}", e);
            Err(store_error_response(e))
        }
    }
}
