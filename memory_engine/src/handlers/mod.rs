pub mod cache;
pub mod chat;
pub mod context;
pub mod health;
pub mod memory;

use axum::http::StatusCode;

use crate::errors::StoreError;

/// Map a store-layer failure onto an HTTP response. Unavailability is a
/// 503 naming the component so callers can tell "down" from "broken".
pub(crate) fn store_error_response(err: StoreError) -> (StatusCode, String) {
    match err {
        StoreError::Unavailable(_) | StoreError::ClientUnavailable(_) => {
            (StatusCode::SERVICE_UNAVAILABLE, err.to_string())
        }
        StoreError::Connectivity(_) | StoreError::Encoding(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}
