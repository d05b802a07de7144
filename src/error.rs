//! Error types for the response cache
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
/// Unified error type for storage backends and the cache controller.
///
/// Malformed durations and malformed stored values are resolved in place
/// and never surface as errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// The storage service could not be reached or a command failed
    #[error("Backend unavailable: {0}")]
    Backend(String),

    /// A scan or delete failed while expiring a group
    #[error("Failed to expire group '{group}': {message}")]
    GroupExpiry { group: String, message: String },

    /// Invalid input handed to a store
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Internal error, e.g. a response body that could not be captured
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CacheError {
    /// Wraps a backend failure raised while expiring `group`.
    pub fn group_expiry(group: &str, source: CacheError) -> Self {
        let message = match source {
            CacheError::Backend(msg) | CacheError::Internal(msg) => msg,
            other => other.to_string(),
        };
        CacheError::GroupExpiry {
            group: group.to_string(),
            message,
        }
    }
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        CacheError::Backend(err.to_string())
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::Backend(_) | CacheError::GroupExpiry { .. } => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the response cache.
pub type Result<T> = std::result::Result<T, CacheError>;
