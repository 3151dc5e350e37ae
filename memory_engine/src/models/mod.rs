//! Models for the memory engine

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::services::{
    CacheClient, EmbeddingClient, HealthController, RetrievalService, VectorMemoryClient,
};

/// Component name of the short-term cache store (essential).
pub const CACHE_COMPONENT: &str = "cache";
/// Component name of the long-term semantic memory store (optional).
pub const VECTOR_COMPONENT: &str = "vector_memory";

/// Application state
pub struct AppState {
    pub cache: Arc<CacheClient>,
    pub vector: Arc<VectorMemoryClient>,
    pub embedder: Arc<EmbeddingClient>,
    pub retrieval: RetrievalService<CacheClient, VectorMemoryClient, EmbeddingClient>,
    pub health: HealthController,
    pub config: memhub_config::AppConfig,
}

// ============================================================================
// HEALTH MODEL
// ============================================================================

/// Per-component liveness state. Only the health controller writes these.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ComponentState {
    Healthy,
    Degraded,
    Failed,
    /// Initial state only; a component never returns to `Unknown` once probed.
    Unknown,
}

/// Aggregate state over all registered components.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OverallState {
    Healthy,
    Degraded,
    Failed,
}

/// Probe result for a single backing store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentStatus {
    pub name: String,
    pub state: ComponentState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub last_checked: DateTime<Utc>,
}

impl ComponentStatus {
    pub fn healthy(name: &str, latency_ms: u64) -> Self {
        Self {
            name: name.to_string(),
            state: ComponentState::Healthy,
            latency_ms: Some(latency_ms),
            detail: None,
            last_checked: Utc::now(),
        }
    }

    pub fn degraded(name: &str, latency_ms: u64, detail: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            state: ComponentState::Degraded,
            latency_ms: Some(latency_ms),
            detail: Some(detail.into()),
            last_checked: Utc::now(),
        }
    }

    pub fn failed(name: &str, detail: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            state: ComponentState::Failed,
            latency_ms: None,
            detail: Some(detail.into()),
            last_checked: Utc::now(),
        }
    }

    pub fn unknown(name: &str) -> Self {
        Self {
            name: name.to_string(),
            state: ComponentState::Unknown,
            latency_ms: None,
            detail: Some("not probed yet".to_string()),
            last_checked: Utc::now(),
        }
    }
}

/// The process-wide health aggregate. Replaced whole on every computation;
/// readers never observe a partially updated mix of component states.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemHealth {
    pub overall: OverallState,
    pub components: HashMap<String, ComponentStatus>,
    pub computed_at: DateTime<Utc>,
}

impl SystemHealth {
    pub fn component_state(&self, name: &str) -> ComponentState {
        self.components
            .get(name)
            .map(|c| c.state)
            .unwrap_or(ComponentState::Unknown)
    }
}

// ============================================================================
// CACHE / CHAT HISTORY MODEL
// ============================================================================

/// Result of a cache read. `Miss` means "checked, nothing there";
/// `Unavailable` means "could not check". Callers must never see one
/// standing in for the other.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup<T> {
    Hit(T),
    Miss,
    Unavailable,
}

/// Result of a cache write. The client reports unavailability instead of
/// pretending a write against a downed store succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    Unavailable,
}

/// Stored representation of one cache value. Expiry is enforced by the
/// backing store; `ttl_secs` and `written_at` are carried for inspection,
/// not re-implemented client-side.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheEntry {
    pub key: String,
    pub value: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl_secs: Option<u64>,
    pub written_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(key: impl Into<String>, value: Value, ttl_secs: Option<u64>) -> Self {
        Self {
            key: key.into(),
            value,
            ttl_secs,
            written_at: Utc::now(),
        }
    }
}

/// One turn in a session's chat history. Append-only, insertion-ordered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatTurn {
    pub session_id: String,
    pub role: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatTurn {
    pub fn new(session_id: impl Into<String>, role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            role: role.into(),
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

// ============================================================================
// SEMANTIC MEMORY MODEL
// ============================================================================

/// A long-term memory record. Embeddings are immutable once written:
/// updates insert a new record id, they never mutate in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub id: Uuid,
    pub embedding: Vec<f32>,
    pub text: String,
    #[serde(default)]
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
}

impl MemoryRecord {
    pub fn new(embedding: Vec<f32>, text: impl Into<String>, metadata: Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            embedding,
            text: text.into(),
            metadata,
            created_at: Utc::now(),
        }
    }
}

/// A scored similarity hit returned from the vector store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryHit {
    pub id: String,
    pub score: f32,
    pub text: String,
    #[serde(default)]
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
}

/// Query result carrying an explicit availability flag so "no relevant
/// memories" and "memory unavailable" never share a representation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryQueryResult {
    pub hits: Vec<MemoryHit>,
    pub source_available: bool,
}

impl MemoryQueryResult {
    pub fn available(hits: Vec<MemoryHit>) -> Self {
        Self { hits, source_available: true }
    }

    pub fn unavailable() -> Self {
        Self { hits: Vec::new(), source_available: false }
    }
}

// ============================================================================
// RETRIEVAL CONTEXT
// ============================================================================

/// Per-query retrieval bundle handed to the generation step. Built fresh on
/// every pipeline invocation and discarded after generation consumes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalContext {
    pub cache_hits: Vec<ChatTurn>,
    pub memory_hits: Vec<MemoryHit>,
    /// Names of the components that were actually consulted for this query.
    pub sources_used: BTreeSet<String>,
}

impl RetrievalContext {
    pub fn empty() -> Self {
        Self {
            cache_hits: Vec::new(),
            memory_hits: Vec::new(),
            sources_used: BTreeSet::new(),
        }
    }
}

// ============================================================================
// REQUEST / RESPONSE TYPES
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct AppendTurnRequest {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct CacheSetRequest {
    pub value: Value,
    pub ttl_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct UpsertMemoryRequest {
    pub text: String,
    #[serde(default)]
    pub metadata: Option<Value>,
    /// Pre-computed embedding; when absent the engine embeds `text` itself.
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
}

#[derive(Debug, Serialize)]
pub struct UpsertMemoryResponse {
    pub id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct MemorySearchRequest {
    /// Query text to embed; ignored when `embedding` is supplied.
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_top_k() -> usize {
    8
}

#[derive(Debug, Deserialize)]
pub struct ContextQueryRequest {
    pub query: String,
    pub session_id: String,
    #[serde(default)]
    pub top_k: Option<usize>,
    #[serde(default)]
    pub history_limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct ContextQueryResponse {
    #[serde(flatten)]
    pub context: RetrievalContext,
    pub took_ms: u64,
}
