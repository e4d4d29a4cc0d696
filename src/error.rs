//! Error types for the key-value server
//!
//! Provides unified error handling using thiserror. Errors are layered:
//! the store adapter reports [`StoreError`], the cache-aside service wraps it
//! in [`ServiceError`], and the HTTP layer maps everything to [`ApiError`].

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Store Error Enum ==
/// Failure reported by a durable store adapter.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Could not open a connection to the store
    #[error("Store connection failed: {0}")]
    Connect(String),

    /// A statement failed to prepare or execute
    #[error("Store query failed: {0}")]
    Query(String),

    /// No pooled connection became free in time
    #[error("Timed out after {0}ms waiting for a store connection")]
    PoolTimeout(u64),

    /// The pool was closed during shutdown
    #[error("Store connection pool is closed")]
    PoolClosed,

    /// The store refused the operation
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Query(err.to_string())
    }
}

// == Service Error Enum ==
/// Failure of a cache-aside operation.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// The durable store failed; the cache was left untouched
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Key does not exist (only raised by the existence-checking delete)
    #[error("Key not found: {0}")]
    NotFound(i64),

    /// The service has been shut down
    #[error("Service is shut down")]
    ShutDown,
}

// == Config Error Enum ==
/// Invalid configuration value.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be greater than zero")]
    Zero { name: &'static str },

    #[error("CACHE_SHARDS ({shards}) must not exceed CACHE_CAPACITY ({capacity})")]
    TooManyShards { shards: usize, capacity: usize },

    #[error("Unknown STORE_BACKEND '{0}', expected 'sqlite' or 'memory'")]
    UnknownBackend(String),
}

// == Api Error Enum ==
/// Unified error type returned by HTTP handlers.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Key not found in cache or store
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The durable store failed
    #[error("Database error: {0}")]
    Store(String),

    /// Server cannot currently serve requests
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Store(e) => ApiError::Store(e.to_string()),
            ServiceError::NotFound(key) => ApiError::NotFound(key.to_string()),
            ServiceError::ShutDown => ApiError::Unavailable("service is shut down".to_string()),
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for HTTP handlers.
pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        let test_cases = vec![
            (ApiError::NotFound("1".to_string()), StatusCode::NOT_FOUND),
            (ApiError::InvalidRequest("bad".to_string()), StatusCode::BAD_REQUEST),
            (ApiError::Store("down".to_string()), StatusCode::INTERNAL_SERVER_ERROR),
            (ApiError::Unavailable("closed".to_string()), StatusCode::SERVICE_UNAVAILABLE),
            (ApiError::Internal("error".to_string()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (error, expected_status) in test_cases {
            let response = error.into_response();
            assert_eq!(response.status(), expected_status);
        }
    }

    #[test]
    fn test_service_error_conversion() {
        let err: ApiError = ServiceError::Store(StoreError::PoolClosed).into();
        assert!(matches!(err, ApiError::Store(_)));

        let err: ApiError = ServiceError::NotFound(7).into();
        assert!(matches!(err, ApiError::NotFound(ref k) if k == "7"));

        let err: ApiError = ServiceError::ShutDown.into();
        assert!(matches!(err, ApiError::Unavailable(_)));
    }

    #[test]
    fn test_rusqlite_error_becomes_query_error() {
        let err: StoreError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, StoreError::Query(_)));
    }
}
