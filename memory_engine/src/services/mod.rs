pub mod cache;
pub mod embedding_client;
pub mod health;
pub mod probe;
pub mod retrieval;
pub mod vector_store;

pub use cache::CacheClient;
pub use embedding_client::EmbeddingClient;
pub use health::{HealthController, HealthRegister, StoreRegistration};
pub use probe::StoreProbe;
pub use retrieval::{ChatStore, Embedder, RetrievalService, SemanticStore};
pub use vector_store::VectorMemoryClient;
