//! Error types for the response cache
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Cache Error Enum ==
/// Unified error type for the response cache.
///
/// Only `Fetch` ever reaches a cache caller through `get`. Persistence and
/// codec errors are produced internally and swallowed by the synchronizer.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Key is empty or too long
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// The underlying fetcher rejected
    #[error("Fetch failed for {key}: {message}")]
    Fetch { key: String, message: String },

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Snapshot could not be written or read
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Snapshot (de)serialization failed
    #[error("Codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// Durable storage I/O failed
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// Push transport could not deliver events
    #[error("Transport error: {0}")]
    Transport(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::InvalidKey(_) | CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::Fetch { .. } => StatusCode::BAD_GATEWAY,
            CacheError::Transport(_) => StatusCode::SERVICE_UNAVAILABLE,
            CacheError::Persistence(_)
            | CacheError::Codec(_)
            | CacheError::Storage(_)
            | CacheError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the response cache.
pub type Result<T> = std::result::Result<T, CacheError>;
