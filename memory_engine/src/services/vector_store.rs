//! Long-term semantic memory client backed by Qdrant.
//!
//! Unlike the cache store there is no safe local fallback here: when the
//! vector component is not healthy, queries come back empty with
//! `source_available = false` and upserts are rejected rather than queued.
//! Buffering writes behind a health flag risks unbounded growth and stale
//! data on recovery, so callers own the retry.

use std::cmp::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use qdrant_client::{
    prelude::*,
    qdrant::{
        vectors_config::Config, CreateCollection, Distance, Filter, PointStruct,
        SearchPoints, VectorParams, VectorsConfig,
    },
};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::errors::StoreError;
use crate::models::{
    ComponentState, ComponentStatus, MemoryHit, MemoryQueryResult, MemoryRecord,
    VECTOR_COMPONENT,
};
use crate::services::retrieval::SemanticStore;
use crate::services::{HealthRegister, StoreProbe};

pub struct VectorMemoryClient {
    client: Option<QdrantClient>,
    collection: String,
    health: Arc<HealthRegister>,
    timeout: Duration,
}

impl VectorMemoryClient {
    /// Build the client. Connection establishment is lazy, so this only
    /// fails when the client library itself cannot initialize; that state
    /// is kept and reported as `client not available` by probes.
    pub fn connect(
        url: &str,
        collection: &str,
        timeout: Duration,
        health: Arc<HealthRegister>,
    ) -> Self {
        let client = match QdrantClient::from_url(url).build() {
            Ok(client) => {
                info!("🧠 Vector store client initialized for {}", url);
                Some(client)
            }
            Err(e) => {
                warn!("⚠️  Vector store client creation failed: {}", e);
                None
            }
        };

        Self {
            client,
            collection: collection.to_string(),
            health,
            timeout,
        }
    }

    async fn component_healthy(&self) -> bool {
        self.health.component_state(VECTOR_COMPONENT).await == ComponentState::Healthy
    }

    /// Create the memory collection if it doesn't exist. Startup helper,
    /// not part of the query path.
    pub async fn ensure_collection(&self, dimension: usize) -> Result<(), StoreError> {
        let Some(client) = &self.client else {
            return Err(StoreError::ClientUnavailable("vector store".to_string()));
        };

        let collections =
            match tokio::time::timeout(self.timeout, client.list_collections()).await {
                Ok(Ok(response)) => response.collections,
                Ok(Err(e)) => return Err(StoreError::connectivity(e)),
                Err(_) => {
                    return Err(StoreError::Connectivity(format!(
                        "timed out after {:?}",
                        self.timeout
                    )))
                }
            };

        if collections.iter().any(|c| c.name == self.collection) {
            debug!("Collection {} already present", self.collection);
            return Ok(());
        }

        info!(
            "Creating memory collection {} (dim: {})",
            self.collection, dimension
        );
        let create = CreateCollection {
            collection_name: self.collection.clone(),
            vectors_config: Some(VectorsConfig {
                config: Some(Config::Params(VectorParams {
                    size: dimension as u64,
                    distance: Distance::Cosine.into(),
                    ..Default::default()
                })),
            }),
            ..Default::default()
        };

        match tokio::time::timeout(self.timeout, client.create_collection(&create)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(StoreError::connectivity(e)),
            Err(_) => Err(StoreError::Connectivity(format!(
                "timed out after {:?}",
                self.timeout
            ))),
        }
    }

    /// Store one memory record. Records are write-once: an update is a new
    /// record with a new id, never an in-place mutation, so retrieval stays
    /// reproducible for a given query run.
    pub async fn upsert(&self, record: &MemoryRecord) -> Result<(), StoreError> {
        if !self.component_healthy().await {
            return Err(StoreError::unavailable(VECTOR_COMPONENT));
        }
        let Some(client) = &self.client else {
            return Err(StoreError::ClientUnavailable("vector store".to_string()));
        };

        let mut payload = Payload::new();
        payload.insert("text", record.text.clone());
        payload.insert("metadata", record.metadata.to_string());
        payload.insert("created_at", record.created_at.to_rfc3339());
        let point = PointStruct::new(
            record.id.to_string(),
            record.embedding.clone(),
            payload,
        );

        match tokio::time::timeout(
            self.timeout,
            client.upsert_points_blocking(&self.collection, None, vec![point], None),
        )
        .await
        {
            Ok(Ok(_)) => {
                debug!("Stored memory record {}", record.id);
                Ok(())
            }
            Ok(Err(e)) => Err(StoreError::connectivity(e)),
            Err(_) => Err(StoreError::Connectivity(format!(
                "timed out after {:?}",
                self.timeout
            ))),
        }
    }

    /// Similarity query, ranked by score with ties broken by most-recent
    /// `created_at` first so retrieval order is deterministic.
    pub async fn query(
        &self,
        embedding: Vec<f32>,
        top_k: usize,
        filter: Option<Filter>,
    ) -> Result<MemoryQueryResult, StoreError> {
        // Not healthy means the store is not contacted at all; the caller
        // gets an explicit unavailability flag in bounded time.
        if !self.component_healthy().await {
            return Ok(MemoryQueryResult::unavailable());
        }
        let Some(client) = &self.client else {
            return Ok(MemoryQueryResult::unavailable());
        };

        let search = SearchPoints {
            collection_name: self.collection.clone(),
            vector: embedding,
            limit: top_k as u64,
            with_payload: Some(true.into()),
            filter,
            ..Default::default()
        };

        match tokio::time::timeout(self.timeout, client.search_points(&search)).await {
            Ok(Ok(response)) => {
                let mut hits: Vec<MemoryHit> = response
                    .result
                    .into_iter()
                    .map(|point| {
                        let payload =
                            serde_json::to_value(&point.payload).unwrap_or(Value::Null);
                        MemoryHit {
                            id: point
                                .id
                                .map(point_id_to_string)
                                .unwrap_or_default(),
                            score: point.score,
                            text: payload
                                .get("text")
                                .and_then(|v| v.as_str())
                                .unwrap_or_default()
                                .to_string(),
                            metadata: payload
                                .get("metadata")
                                .and_then(|v| v.as_str())
                                .and_then(|s| serde_json::from_str(s).ok())
                                .unwrap_or(Value::Null),
                            created_at: payload
                                .get("created_at")
                                .and_then(|v| v.as_str())
                                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                                .map(|dt| dt.with_timezone(&Utc))
                                .unwrap_or(DateTime::<Utc>::MIN_UTC),
                        }
                    })
                    .collect();

                rank_hits(&mut hits);
                debug!("Found {} memory hits", hits.len());
                Ok(MemoryQueryResult::available(hits))
            }
            Ok(Err(e)) => Err(StoreError::connectivity(e)),
            Err(_) => Err(StoreError::Connectivity(format!(
                "timed out after {:?}",
                self.timeout
            ))),
        }
    }
}

/// Render a Qdrant `PointId` as the string form callers expect: the raw
/// UUID or the decimal of a numeric id. `PointId` does not implement
/// `Display`, so this mirrors the two id variants the store can return.
fn point_id_to_string(id: qdrant_client::qdrant::PointId) -> String {
    use qdrant_client::qdrant::point_id::PointIdOptions;
    match id.point_id_options {
        Some(PointIdOptions::Uuid(uuid)) => uuid,
        Some(PointIdOptions::Num(num)) => num.to_string(),
        None => String::new(),
    }
}

/// Order hits by similarity descending; equal scores rank the newer record
/// first. Deterministic so a given query run is reproducible.
fn rank_hits(hits: &mut [MemoryHit]) {
    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then(b.created_at.cmp(&a.created_at))
    });
}

#[async_trait]
impl StoreProbe for VectorMemoryClient {
    fn component_name(&self) -> &str {
        VECTOR_COMPONENT
    }

    /// Collection-existence check: reaching the store proves connectivity,
    /// and the presence of the memory collection proves it can serve
    /// queries. Reachable but unprovisioned is degraded, not failed.
    async fn probe(&self, timeout: Duration) -> ComponentStatus {
        let Some(client) = &self.client else {
            return ComponentStatus::failed(VECTOR_COMPONENT, "client not available");
        };

        let start = Instant::now();
        match tokio::time::timeout(timeout, client.list_collections()).await {
            Ok(Ok(response)) => {
                let latency = start.elapsed().as_millis() as u64;
                if response.collections.iter().any(|c| c.name == self.collection) {
                    ComponentStatus::healthy(VECTOR_COMPONENT, latency)
                } else {
                    ComponentStatus::degraded(
                        VECTOR_COMPONENT,
                        latency,
                        "collection not provisioned",
                    )
                }
            }
            Ok(Err(e)) => ComponentStatus::failed(VECTOR_COMPONENT, e.to_string()),
            Err(_) => ComponentStatus::failed(
                VECTOR_COMPONENT,
                format!("timed out after {:?}", timeout),
            ),
        }
    }
}

#[async_trait]
impl SemanticStore for VectorMemoryClient {
    async fn similar(
        &self,
        embedding: Vec<f32>,
        top_k: usize,
    ) -> Result<MemoryQueryResult, StoreError> {
        self.query(embedding, top_k, None).await
    }
}
