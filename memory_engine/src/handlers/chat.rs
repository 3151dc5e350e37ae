//! Chat history endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info};

use crate::handlers::store_error_response;
use crate::models::{
    AppendTurnRequest, AppState, CacheLookup, ChatTurn, HistoryParams, WriteOutcome,
};

/// POST /api/sessions/{session_id}/turns
pub async fn append_turn(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Json(request): Json<AppendTurnRequest>,
) -> Result<Json<Value>, (StatusCode, String)> {
    let turn = ChatTurn::new(&session_id, request.role, request.content);

    match state.cache.append_chat_turn(&session_id, &turn).await {
        Ok(WriteOutcome::Written) => {
            info!("💬 Appended turn to session {}", session_id);
            Ok(Json(json!({ "appended": true, "session_id": session_id })))
        }
        Ok(WriteOutcome::Unavailable) => Err((
            StatusCode::SERVICE_UNAVAILABLE,
            "cache component is unavailable".to_string(),
        )),
        Err(e) => {
            error!("❌ Failed to append chat turn: {}", e);
            Err(store_error_response(e))
        }
    }
}

/// GET /api/sessions/{session_id}/history?limit=N
pub async fn get_history(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<Vec<ChatTurn>>, (StatusCode, String)> {
    let limit = params.limit.unwrap_or(state.config.history_limit);

    match state.cache.get_chat_history(&session_id, limit).await {
        Ok(CacheLookup::Hit(turns)) => Ok(Json(turns)),
        Ok(CacheLookup::Miss) => Ok(Json(Vec::new())),
        Ok(CacheLookup::Unavailable) => Err((
            StatusCode::SERVICE_UNAVAILABLE,
            "cache component is unavailable".to_string(),
        )),
        Err(e) => {
            error!("❌ Failed to fetch chat history: {}", e);
            Err(store_error_response(e))
        }
    }
}
