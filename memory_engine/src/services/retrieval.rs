//! RAG retrieval pipeline.
//!
//! Per query: read the health snapshot once, consult whichever stores are
//! usable (concurrently), and assemble a [`RetrievalContext`] that records
//! exactly which sources informed it. An unavailable store shrinks the
//! context; it never fails the request.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::errors::{RetrievalError, StoreError};
use crate::models::{
    CacheLookup, ChatTurn, ComponentState, MemoryQueryResult, RetrievalContext,
    CACHE_COMPONENT, VECTOR_COMPONENT,
};
use crate::services::HealthRegister;

/// Read capability over the chat-history side of the cache store.
#[async_trait]
pub trait ChatStore: Send + Sync {
    async fn recent_history(
        &self,
        session_id: &str,
        limit: usize,
    ) -> Result<CacheLookup<Vec<ChatTurn>>, StoreError>;
}

/// Similarity-query capability over the semantic memory store.
#[async_trait]
pub trait SemanticStore: Send + Sync {
    async fn similar(
        &self,
        embedding: Vec<f32>,
        top_k: usize,
    ) -> Result<MemoryQueryResult, StoreError>;
}

/// Query-embedding capability (external collaborator).
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>>;
}

pub struct RetrievalService<C, V, E> {
    chat: Arc<C>,
    memory: Arc<V>,
    embedder: Arc<E>,
    health: Arc<HealthRegister>,
    top_k: usize,
    history_limit: usize,
}

impl<C, V, E> RetrievalService<C, V, E>
where
    C: ChatStore,
    V: SemanticStore,
    E: Embedder,
{
    pub fn new(
        chat: Arc<C>,
        memory: Arc<V>,
        embedder: Arc<E>,
        health: Arc<HealthRegister>,
        top_k: usize,
        history_limit: usize,
    ) -> Self {
        Self { chat, memory, embedder, health, top_k, history_limit }
    }

    pub async fn answer_context(
        &self,
        query: &str,
        session_id: &str,
    ) -> Result<RetrievalContext, RetrievalError> {
        self.answer_context_with(query, session_id, self.top_k, self.history_limit)
            .await
    }

    pub async fn answer_context_with(
        &self,
        query: &str,
        session_id: &str,
        top_k: usize,
        history_limit: usize,
    ) -> Result<RetrievalContext, RetrievalError> {
        if query.trim().is_empty() {
            return Err(RetrievalError::EmptyQuery);
        }

        // One health read per call. Decisions stay consistent for the whole
        // request even if a refresh lands mid-flight.
        let snapshot = self.health.current().await;
        let cache_usable =
            snapshot.component_state(CACHE_COMPONENT) != ComponentState::Failed;
        let vector_usable =
            snapshot.component_state(VECTOR_COMPONENT) == ComponentState::Healthy;

        let history_branch = async {
            if !cache_usable {
                debug!("Skipping chat history: cache component failed");
                return None;
            }
            match self.chat.recent_history(session_id, history_limit).await {
                Ok(CacheLookup::Hit(turns)) => Some(turns),
                Ok(CacheLookup::Miss) => Some(Vec::new()),
                Ok(CacheLookup::Unavailable) => {
                    warn!("⚠️  Chat history skipped: cache unavailable");
                    None
                }
                Err(e) => {
                    warn!("⚠️  Chat history fetch failed: {}", e);
                    None
                }
            }
        };

        let memory_branch = async {
            if !vector_usable {
                debug!("Skipping semantic memory: vector component not healthy");
                return None;
            }
            let embedding = match self.embedder.embed(query).await {
                Ok(embedding) => embedding,
                Err(e) => {
                    warn!("⚠️  Query embedding failed: {}", e);
                    return None;
                }
            };
            match self.memory.similar(embedding, top_k).await {
                Ok(result) if result.source_available => Some(result.hits),
                Ok(_) => {
                    warn!("⚠️  Semantic memory reported unavailable mid-query");
                    None
                }
                Err(e) => {
                    warn!("⚠️  Semantic memory query failed: {}", e);
                    None
                }
            }
        };

        // Join point: both branches complete (or are skipped) before
        // assembly; the first result does not short-circuit the other.
        let (history, memories) = tokio::join!(history_branch, memory_branch);

        let mut context = RetrievalContext::empty();
        if let Some(turns) = history {
            context.sources_used.insert(CACHE_COMPONENT.to_string());
            context.cache_hits = turns;
        }
        if let Some(hits) = memories {
            context.sources_used.insert(VECTOR_COMPONENT.to_string());
            context.memory_hits = hits;
        }

        Ok(context)
    }
}
