//! RAG context endpoint.

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use crate::errors::RetrievalError;
use crate::models::{AppState, ContextQueryRequest, ContextQueryResponse};

/// POST /api/context/query
///
/// Assembles the retrieval context for a query. Degradation shrinks the
/// context, it never turns into an error: the only 4xx here is an empty
/// query, which is a caller mistake.
pub async fn query_context(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ContextQueryRequest>,
) -> Result<Json<ContextQueryResponse>, (StatusCode, String)> {
    info!(
        "📥 Context query for session={}: '{}'",
        request.session_id, request.query
    );

    let start = Instant::now();
    let top_k = request.top_k.unwrap_or(state.config.retrieval_top_k);
    let history_limit = request
        .history_limit
        .unwrap_or(state.config.history_limit);

    match state
        .retrieval
        .answer_context_with(&request.query, &request.session_id, top_k, history_limit)
        .await
    {
        Ok(context) => {
            let took_ms = start.elapsed().as_millis() as u64;
            info!(
                "✅ Context assembled: {} turns, {} memories, sources={:?}, {}ms",
                context.cache_hits.len(),
                context.memory_hits.len(),
                context.sources_used,
                took_ms
            );
            Ok(Json(ContextQueryResponse { context, took_ms }))
        }
        Err(RetrievalError::EmptyQuery) => Err((
            StatusCode::BAD_REQUEST,
            "query text must not be empty".to_string(),
        )),
    }
}
