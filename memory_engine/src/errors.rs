use thiserror::Error;

/// Failure taxonomy for backing-store access.
///
/// Everything below the client wrappers is converted into one of these at
/// the boundary; raw `redis`/qdrant/transport errors never travel upward.
/// A valid miss is *not* an error (see `CacheLookup::Miss`), and neither is
/// "skipped because the component is down" pretending to be a miss.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Refused connection, reset, or timeout. A timed-out call is treated
    /// identically to a connection failure for status purposes.
    #[error("connectivity failure: {0}")]
    Connectivity(String),

    /// The client library itself never initialized, as opposed to a live
    /// client that cannot reach the store.
    #[error("client not available: {0}")]
    ClientUnavailable(String),

    /// Operation short-circuited because the owning component is not
    /// healthy enough to serve it.
    #[error("{0} component is unavailable")]
    Unavailable(String),

    /// A value could not be encoded for storage. Not a transport fault.
    #[error("encoding failure: {0}")]
    Encoding(String),
}

impl StoreError {
    pub fn connectivity(err: impl std::fmt::Display) -> Self {
        Self::Connectivity(err.to_string())
    }

    pub fn unavailable(component: &str) -> Self {
        Self::Unavailable(component.to_string())
    }
}

/// Errors surfaced by the retrieval pipeline itself.
///
/// An unavailable backing store is never one of them: retrieval degrades to
/// an emptier context instead of failing the request.
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("query text must not be empty")]
    EmptyQuery,
}
