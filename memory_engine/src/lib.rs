//! MemHub memory engine.
//!
//! Short-term cache/chat history (Redis) and long-term semantic memory
//! (Qdrant) behind a health-verification controller, fronted by a RAG
//! retrieval pipeline that degrades gracefully when a backing store is down.

pub mod errors;
pub mod handlers;
pub mod models;
pub mod services;
