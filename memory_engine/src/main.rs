use axum::{
    routing::{get, post, put},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;

use memhub_observability::{error, info, init_tracing, warn, TracingConfig};

use memory_engine::handlers::{cache, chat, context, health, memory};
use memory_engine::models::{
    AppState, ComponentState, OverallState, CACHE_COMPONENT, VECTOR_COMPONENT,
};
use memory_engine::services::{
    CacheClient, EmbeddingClient, HealthController, HealthRegister, RetrievalService,
    StoreRegistration, VectorMemoryClient,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize observability with structured logging
    init_tracing(TracingConfig::for_service("memory-engine").json());

    let config = memhub_config::AppConfig::from_env();

    info!("🚀 [Memory Engine] Starting on {}:{}", config.host, config.port);
    info!("💾 Cache store: {}", config.redis_url);
    info!(
        "🧠 Vector store: {} (collection: {})",
        config.qdrant_url, config.memory_collection
    );
    info!("📡 Embedding service: {}", config.embedding_service_url);

    // Shared health register: written only by the controller, read by
    // every store client and the retrieval pipeline.
    let register = Arc::new(HealthRegister::new());

    let cache_client = Arc::new(
        CacheClient::connect(&config.redis_url, config.store_timeout, register.clone())
            .await,
    );
    let vector_client = Arc::new(VectorMemoryClient::connect(
        &config.qdrant_url,
        &config.memory_collection,
        config.store_timeout,
        register.clone(),
    ));
    let embedder = Arc::new(EmbeddingClient::new(
        config.embedding_service_url.clone(),
        config.store_timeout,
    ));

    // The cache store is essential; semantic memory is optional and only
    // degrades the service when down.
    let controller = HealthController::new(
        vec![
            StoreRegistration::essential(
                CACHE_COMPONENT,
                config.store_timeout,
                cache_client.clone(),
            ),
            StoreRegistration::optional(
                VECTOR_COMPONENT,
                config.store_timeout,
                vector_client.clone(),
            ),
        ],
        register.clone(),
    );

    let startup_health = controller.run_startup_check().await;
    match startup_health.overall {
        OverallState::Healthy => info!("✅ All backing stores healthy"),
        OverallState::Degraded => {
            warn!("⚠️  Starting in degraded mode: some stores are impaired")
        }
        OverallState::Failed => {
            for component in startup_health.components.values() {
                if component.state == ComponentState::Failed {
                    error!(
                        "❌ {} failed: {}",
                        component.name,
                        component.detail.as_deref().unwrap_or("no detail")
                    );
                }
            }
            if config.strict_startup {
                return Err("essential store failed startup health check".into());
            }
            warn!("⚠️  Essential store down; starting anyway (strict startup disabled)");
        }
    }

    if startup_health.component_state(VECTOR_COMPONENT) == ComponentState::Healthy {
        if let Err(e) = vector_client.ensure_collection(config.embedding_dimension).await {
            warn!("⚠️  Could not provision memory collection: {}", e);
        }
    }

    let retrieval = RetrievalService::new(
        cache_client.clone(),
        vector_client.clone(),
        embedder.clone(),
        register.clone(),
        config.retrieval_top_k,
        config.history_limit,
    );

    let state = Arc::new(AppState {
        cache: cache_client,
        vector: vector_client,
        embedder,
        retrieval,
        health: controller,
        config: config.clone(),
    });

    // Build router
    let app = Router::new()
        // Health checks
        .route("/health", get(health::refresh_health))
        .route("/health/current", get(health::current_health))
        // Chat history
        .route("/api/sessions/:session_id/turns", post(chat::append_turn))
        .route("/api/sessions/:session_id/history", get(chat::get_history))
        // Generic cache entries
        .route("/api/cache/:key", put(cache::put_entry).get(cache::get_entry))
        // Semantic memory
        .route("/api/memory/records", post(memory::upsert_record))
        .route("/api/memory/search", post(memory::search_memory))
        // RAG context assembly
        .route("/api/context/query", post(context::query_context))
        .with_state(state)
        .layer(tower_http::cors::CorsLayer::permissive())
        .layer(tower_http::trace::TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("✅ Memory Engine listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
