//! Environment-driven configuration for MemHub services.
//!
//! Every knob has a default that works against a local docker-compose stack,
//! so a bare `cargo run` comes up without any environment at all.

use std::time::Duration;

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,

    /// Short-term cache / chat-history store.
    pub redis_url: String,
    /// Long-term semantic memory store.
    pub qdrant_url: String,
    pub memory_collection: String,
    pub embedding_dimension: usize,

    /// External embedding service consumed by the retrieval path.
    pub embedding_service_url: String,

    /// Upper bound for any single store probe or store round-trip.
    pub store_timeout: Duration,

    /// Default number of memory hits to retrieve per query.
    pub retrieval_top_k: usize,
    /// Default number of chat turns pulled into a retrieval context.
    pub history_limit: usize,

    /// When true, a failed essential store at startup aborts the process
    /// instead of starting in degraded mode.
    pub strict_startup: bool,
}

impl AppConfig {
    pub fn from_env() -> Self {
        // Best-effort .env load for local development
        dotenv::dotenv().ok();

        Self {
            host: env_or("MEMORY_ENGINE_HOST", "0.0.0.0"),
            port: env_parse("MEMORY_ENGINE_PORT", 3020),
            redis_url: env_or("REDIS_URL", "redis://localhost:6379"),
            qdrant_url: env_or("QDRANT_URL", "http://localhost:6334"),
            memory_collection: env_or("MEMORY_COLLECTION", "memhub_memories"),
            embedding_dimension: env_parse("EMBEDDING_DIMENSION", 768),
            embedding_service_url: env_or(
                "EMBEDDING_SERVICE_URL",
                "http://localhost:8082",
            ),
            store_timeout: Duration::from_secs(env_parse("STORE_TIMEOUT_SECS", 3u64)),
            retrieval_top_k: env_parse("RETRIEVAL_TOP_K", 8),
            history_limit: env_parse("HISTORY_LIMIT", 20),
            strict_startup: env_parse("MEMORY_ENGINE_STRICT_STARTUP", false),
        }
    }
}
