//! Health endpoint handlers.
//!
//! These must respond even when every backing store is down; the endpoint
//! itself never depends on a healthy store.

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::models::{AppState, SystemHealth};

/// GET /health
///
/// Re-probes every registered store and reports the fresh aggregate.
/// Always a 200: a failed component is a report, not an endpoint error.
pub async fn refresh_health(State(state): State<Arc<AppState>>) -> Json<SystemHealth> {
    let health = state.health.refresh_health().await;
    Json((*health).clone())
}

/// GET /health/current
///
/// Last computed aggregate without re-probing; cheap enough for tight
/// polling loops.
pub async fn current_health(State(state): State<Arc<AppState>>) -> Json<SystemHealth> {
    let health = state.health.current_health().await;
    Json((*health).clone())
}
