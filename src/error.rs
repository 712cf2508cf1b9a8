//! Error types for the distributed cache
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for groups, loaders and the peer protocol.
///
/// Payloads are plain strings so the error is `Clone`: one failed load is
/// handed to every caller that was waiting on it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Rejected input (empty key, malformed peer path)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Group name is not registered
    #[error("No such group: {0}")]
    NoSuchGroup(String),

    /// A group with this name is already registered
    #[error("Group already registered: {0}")]
    DuplicateGroup(String),

    /// The data loader has no value for this key
    #[error("Key not found: {0}")]
    KeyNotFound(String),

    /// The data loader failed
    #[error("Loader error: {0}")]
    Loader(String),

    /// A remote peer could not serve the request
    #[error("Peer error: {0}")]
    Peer(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CacheError {
    /// HTTP status used when this error crosses an HTTP boundary.
    pub fn status_code(&self) -> StatusCode {
        match self {
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::NoSuchGroup(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.to_string()
        }));

        (self.status_code(), body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;
