//! Integration tests against live backing stores.
//!
//! Run with `cargo test -- --ignored` against a local stack: Redis on
//! localhost:6379 and Qdrant on localhost:6334.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use memory_engine::models::{
    CacheLookup, ChatTurn, ComponentState, MemoryRecord, OverallState, WriteOutcome,
    CACHE_COMPONENT, VECTOR_COMPONENT,
};
use memory_engine::services::{
    CacheClient, Embedder, HealthController, HealthRegister, RetrievalService,
    StoreRegistration, VectorMemoryClient,
};

const REDIS_URL: &str = "redis://localhost:6379";
const QDRANT_URL: &str = "http://localhost:6334";
const DEAD_QDRANT: &str = "http://127.0.0.1:1";
const STORE_TIMEOUT: Duration = Duration::from_secs(3);

struct StaticEmbedder;

#[async_trait]
impl Embedder for StaticEmbedder {
    async fn embed(&self, _text: &str) -> anyhow::Result<Vec<f32>> {
        Ok(vec![0.25, 0.25, 0.25, 0.25])
    }
}

async fn live_cache() -> (Arc<CacheClient>, Arc<HealthRegister>) {
    let register = Arc::new(HealthRegister::new());
    let cache =
        Arc::new(CacheClient::connect(REDIS_URL, STORE_TIMEOUT, register.clone()).await);
    (cache, register)
}

#[tokio::test]
#[ignore] // Requires running Redis instance
async fn chat_history_preserves_insertion_order_and_session_isolation() {
    let (cache, _register) = live_cache().await;

    let session_a = format!("test-{}", Uuid::new_v4());
    let session_b = format!("test-{}", Uuid::new_v4());

    for content in ["first", "second", "third"] {
        let turn = ChatTurn::new(&session_a, "user", content);
        let outcome = cache.append_chat_turn(&session_a, &turn).await.unwrap();
        assert_eq!(outcome, WriteOutcome::Written);
    }
    let noise = ChatTurn::new(&session_b, "user", "unrelated");
    cache.append_chat_turn(&session_b, &noise).await.unwrap();

    let history = match cache.get_chat_history(&session_a, 10).await.unwrap() {
        CacheLookup::Hit(turns) => turns,
        other => panic!("expected history hit, got {:?}", other),
    };

    let contents: Vec<&str> = history.iter().map(|t| t.content.as_str()).collect();
    assert_eq!(contents, vec!["first", "second", "third"]);
    assert!(history.iter().all(|t| t.session_id == session_a));
}

#[tokio::test]
#[ignore] // Requires running Redis instance
async fn history_limit_returns_most_recent_turns() {
    let (cache, _register) = live_cache().await;
    let session = format!("test-{}", Uuid::new_v4());

    for i in 0..5 {
        let turn = ChatTurn::new(&session, "user", format!("turn-{}", i));
        cache.append_chat_turn(&session, &turn).await.unwrap();
    }

    let history = match cache.get_chat_history(&session, 2).await.unwrap() {
        CacheLookup::Hit(turns) => turns,
        other => panic!("expected history hit, got {:?}", other),
    };

    let contents: Vec<&str> = history.iter().map(|t| t.content.as_str()).collect();
    assert_eq!(contents, vec!["turn-3", "turn-4"]);
}

#[tokio::test]
#[ignore] // Requires running Redis instance
async fn probe_is_stable_against_an_unchanged_store() {
    let (cache, register) = live_cache().await;
    let controller = HealthController::new(
        vec![StoreRegistration::essential(
            CACHE_COMPONENT,
            STORE_TIMEOUT,
            cache.clone(),
        )],
        register,
    );

    let first = controller.refresh_health().await;
    let second = controller.refresh_health().await;

    assert_eq!(first.component_state(CACHE_COMPONENT), ComponentState::Healthy);
    assert_eq!(second.component_state(CACHE_COMPONENT), ComponentState::Healthy);
    // Two immediate probes of the same healthy store don't flap.
    assert_eq!(first.overall, OverallState::Healthy);
    assert_eq!(second.overall, OverallState::Healthy);
}

#[tokio::test]
#[ignore] // Requires running Redis instance
async fn retrieval_uses_cache_only_while_vector_store_is_down() {
    let register = Arc::new(HealthRegister::new());
    let cache =
        Arc::new(CacheClient::connect(REDIS_URL, STORE_TIMEOUT, register.clone()).await);
    let vector = Arc::new(VectorMemoryClient::connect(
        DEAD_QDRANT,
        "memhub_memories",
        Duration::from_millis(500),
        register.clone(),
    ));
    let controller = HealthController::new(
        vec![
            StoreRegistration::essential(CACHE_COMPONENT, STORE_TIMEOUT, cache.clone()),
            StoreRegistration::optional(
                VECTOR_COMPONENT,
                Duration::from_millis(500),
                vector.clone(),
            ),
        ],
        register.clone(),
    );

    let health = controller.run_startup_check().await;
    assert_eq!(health.overall, OverallState::Degraded);

    let session = format!("test-{}", Uuid::new_v4());
    let turn = ChatTurn::new(&session, "user", "My name is Ada.");
    cache.append_chat_turn(&session, &turn).await.unwrap();

    let retrieval = RetrievalService::new(
        cache,
        vector,
        Arc::new(StaticEmbedder),
        register,
        5,
        10,
    );
    let context = retrieval
        .answer_context("What's my name?", &session)
        .await
        .unwrap();

    let sources: Vec<&str> = context.sources_used.iter().map(String::as_str).collect();
    assert_eq!(sources, vec![CACHE_COMPONENT]);
    assert_eq!(context.cache_hits.len(), 1);
    assert!(context.memory_hits.is_empty());
}

#[tokio::test]
#[ignore] // Requires running Qdrant instance
async fn memory_round_trip_through_qdrant() {
    let register = Arc::new(HealthRegister::new());
    let collection = format!("memhub_test_{}", Uuid::new_v4().simple());
    let vector = Arc::new(VectorMemoryClient::connect(
        QDRANT_URL,
        &collection,
        STORE_TIMEOUT,
        register.clone(),
    ));

    vector.ensure_collection(4).await.unwrap();

    let controller = HealthController::new(
        vec![StoreRegistration::optional(
            VECTOR_COMPONENT,
            STORE_TIMEOUT,
            vector.clone(),
        )],
        register,
    );
    let health = controller.run_startup_check().await;
    assert_eq!(
        health.component_state(VECTOR_COMPONENT),
        ComponentState::Healthy
    );

    let record = MemoryRecord::new(
        vec![0.25, 0.25, 0.25, 0.25],
        "the user's name is Ada",
        serde_json::json!({ "kind": "profile" }),
    );
    vector.upsert(&record).await.unwrap();

    let result = vector
        .query(vec![0.25, 0.25, 0.25, 0.25], 1, None)
        .await
        .unwrap();

    assert!(result.source_available);
    assert_eq!(result.hits.len(), 1);
    assert_eq!(result.hits[0].id, record.id.to_string());
    assert_eq!(result.hits[0].text, "the user's name is Ada");
}
