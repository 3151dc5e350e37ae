use std::time::Duration;

use async_trait::async_trait;

use crate::models::ComponentStatus;

/// Bounded-time capability check against one backing store.
///
/// Implementations perform the cheapest operation that proves read/write
/// capability (a set+get round trip for the cache store, a collection
/// listing for the vector store) and convert every failure into a status
/// value. A probe never panics, never propagates a transport error, and
/// never retries internally; retry policy belongs to the caller.
#[async_trait]
pub trait StoreProbe: Send + Sync {
    /// Component name this store is registered under.
    fn component_name(&self) -> &str;

    /// Probe the store, returning within `timeout`.
    async fn probe(&self, timeout: Duration) -> ComponentStatus;
}
