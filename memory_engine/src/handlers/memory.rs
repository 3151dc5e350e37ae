//! Semantic memory endpoints.

use axum::{extract::State, http::StatusCode, Json};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info};

use crate::handlers::store_error_response;
use crate::models::{
    AppState, MemoryQueryResult, MemoryRecord, MemorySearchRequest,
    UpsertMemoryRequest, UpsertMemoryResponse,
};

/// POST /api/memory/records
///
/// Stores a new memory record. When no embedding is supplied the text is
/// embedded via the external embedding service first. A rejected upsert
/// (store not healthy) is the caller's cue to retry later; nothing is
/// queued on their behalf.
pub async fn upsert_record(
    State(state): State<Arc<AppState>>,
    Json(request): Json<UpsertMemoryRequest>,
) -> Result<Json<UpsertMemoryResponse>, (StatusCode, String)> {
    if request.text.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "text must not be empty".to_string(),
        ));
    }

    let embedding = match request.embedding {
        Some(embedding) => embedding,
        None => state.embedder.embed_text(&request.text).await.map_err(|e| {
            error!("❌ Failed to embed memory text: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to embed text: {}", e),
            )
        })?,
    };

    let record = MemoryRecord::new(
        embedding,
        request.text,
        request.metadata.unwrap_or(Value::Null),
    );
    let id = record.id;

    match state.vector.upsert(&record).await {
        Ok(()) => {
            info!("🧠 Stored memory record {}", id);
            Ok(Json(UpsertMemoryResponse { id }))
        }
        Err(e) => {
            error!("❌ Memory upsert rejected: {}", e);
            Err(store_error_response(e))
        }
    }
}

/// POST /api/memory/search
///
/// Similarity search. An unavailable vector store is a valid 200 response
/// with `source_available = false`, not an error: callers must be able to
/// tell "nothing relevant" from "could not check".
pub async fn search_memory(
    State(state): State<Arc<AppState>>,
    Json(request): Json<MemorySearchRequest>,
) -> Result<Json<MemoryQueryResult>, (StatusCode, String)> {
    let embedding = match (request.embedding, request.query) {
        (Some(embedding), _) => embedding,
        (None, Some(query)) if !query.trim().is_empty() => {
            state.embedder.embed_text(&query).await.map_err(|e| {
                error!("❌ Failed to embed search query: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Failed to embed query: {}", e),
                )
            })?
        }
        _ => {
            return Err((
                StatusCode::BAD_REQUEST,
                "either query text or an embedding is required".to_string(),
            ))
        }
    };

    match state.vector.query(embedding, request.top_k, None).await {
        Ok(result) => Ok(Json(result)),
        Err(e) => {
            error!("❌ Memory search failed: {}", e);
            Err(store_error_response(e))
        }
    }
}
