//! API Handlers
//!
//! HTTP request handlers for each key-value server endpoint. Store calls
//! block, so every cache-aside operation runs on the blocking worker pool.

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    Json,
};
use tracing::error;

use crate::config::Config;
use crate::error::{ApiError, Result, ServiceError, StoreError};
use crate::models::{
    CreateRequest, CreateResponse, DeleteResponse, HealthResponse, ReadResponse, ReadSource,
    StatsResponse,
};
use crate::service::{CacheAside, Lookup};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// The cache-aside service
    pub service: Arc<CacheAside>,
}

impl AppState {
    /// Creates a new AppState around an existing service.
    pub fn new(service: Arc<CacheAside>) -> Self {
        Self { service }
    }

    /// Creates a new AppState from configuration.
    ///
    /// Builds the cache and opens the durable store named by the Config.
    pub fn from_config(config: &Config) -> std::result::Result<Self, StoreError> {
        let service = CacheAside::from_config(config)?;
        Ok(Self::new(Arc::new(service)))
    }
}

/// Runs a blocking service call on the blocking pool.
async fn run_blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> std::result::Result<T, ServiceError> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(result) => result.map_err(ApiError::from),
        Err(join_err) => {
            error!("Worker task failed: {}", join_err);
            Err(ApiError::Internal("worker task failed".to_string()))
        }
    }
}

fn parse_key(path: std::result::Result<Path<i64>, PathRejection>) -> Result<i64> {
    path.map(|Path(key)| key)
        .map_err(|rejection| ApiError::InvalidRequest(rejection.body_text()))
}

/// Handler for POST /create
///
/// Durably stores a key-value pair, then caches it.
pub async fn create_handler(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CreateRequest>, JsonRejection>,
) -> Result<Json<CreateResponse>> {
    let Json(req) = payload.map_err(|rejection| ApiError::InvalidRequest(rejection.body_text()))?;

    if let Some(error_msg) = req.validate() {
        return Err(ApiError::InvalidRequest(error_msg));
    }

    let key = req.key;
    let service = state.service.clone();
    run_blocking(move || service.write(req.key, req.value)).await?;

    Ok(Json(CreateResponse::new(key)))
}

/// Handler for GET /read/:key
///
/// Returns the value from the cache, or from the store on a cache miss.
pub async fn read_handler(
    State(state): State<AppState>,
    path: std::result::Result<Path<i64>, PathRejection>,
) -> Result<Json<ReadResponse>> {
    let key = parse_key(path)?;

    let service = state.service.clone();
    let lookup = run_blocking(move || service.read(key)).await?;

    let source = if lookup.is_hit() {
        ReadSource::Cache
    } else {
        ReadSource::Store
    };
    match lookup.into_value() {
        Some(value) => Ok(Json(ReadResponse::new(key, value, source))),
        None => Err(ApiError::NotFound(key.to_string())),
    }
}

/// Handler for DELETE /delete/:key
///
/// Deletes the key from the store, then from the cache.
pub async fn delete_handler(
    State(state): State<AppState>,
    path: std::result::Result<Path<i64>, PathRejection>,
) -> Result<Json<DeleteResponse>> {
    let key = parse_key(path)?;

    let service = state.service.clone();
    run_blocking(move || service.delete(key)).await?;

    Ok(Json(DeleteResponse::new(key)))
}

/// Handler for GET /stats
///
/// Returns current cache statistics.
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::from(state.service.cache().stats()))
}

/// Handler for GET /health
///
/// Reports healthy when the durable store answers a ping.
pub async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let service = state.service.clone();
    let reachable = run_blocking(move || service.ping_store()).await.is_ok();

    let response = HealthResponse::new(reachable);
    let status = if response.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::LruCache;
    use crate::service::ServiceOptions;
    use crate::store::MemoryStore;

    fn test_state() -> (AppState, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let service = CacheAside::new(
            Box::new(LruCache::new(100)),
            store.clone(),
            ServiceOptions::default(),
        );
        (AppState::new(Arc::new(service)), store)
    }

    fn create_req(key: i64, value: &str) -> std::result::Result<Json<CreateRequest>, JsonRejection> {
        Ok(Json(CreateRequest {
            key,
            value: value.to_string(),
        }))
    }

    #[tokio::test]
    async fn test_create_and_read_handler() {
        let (state, _) = test_state();

        let result = create_handler(State(state.clone()), create_req(1, "one")).await;
        assert!(result.is_ok());

        let response = read_handler(State(state), Ok(Path(1))).await.unwrap();
        assert_eq!(response.value, "one");
        assert_eq!(response.source, ReadSource::Cache);
    }

    #[tokio::test]
    async fn test_read_falls_back_to_store() {
        let (state, store) = test_state();
        store.seed(5, "five");

        let response = read_handler(State(state), Ok(Path(5))).await.unwrap();
        assert_eq!(response.value, "five");
        assert_eq!(response.source, ReadSource::Store);
    }

    #[tokio::test]
    async fn test_read_nonexistent_key() {
        let (state, _) = test_state();

        let result = read_handler(State(state), Ok(Path(404))).await;
        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_create_with_store_failure() {
        let (state, store) = test_state();
        store.set_failing(true);

        let result = create_handler(State(state.clone()), create_req(1, "one")).await;
        assert!(matches!(result, Err(ApiError::Store(_))));
        assert_eq!(state.service.cache().len(), 0);
    }

    #[tokio::test]
    async fn test_delete_handler() {
        let (state, _) = test_state();
        create_handler(State(state.clone()), create_req(2, "two"))
            .await
            .unwrap();

        let result = delete_handler(State(state.clone()), Ok(Path(2))).await;
        assert!(result.is_ok());

        let result = read_handler(State(state), Ok(Path(2))).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_stats_handler() {
        let (state, _) = test_state();

        let response = stats_handler(State(state)).await;
        assert_eq!(response.hits, 0);
        assert_eq!(response.misses, 0);
        assert_eq!(response.capacity, 100);
    }

    #[tokio::test]
    async fn test_health_handler() {
        let (state, store) = test_state();

        let (status, response) = health_handler(State(state.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(response.status, "healthy");

        store.set_failing(true);
        let (status, response) = health_handler(State(state)).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.status, "degraded");
    }

    #[tokio::test]
    async fn test_create_value_too_large() {
        let (state, store) = test_state();
        let big = "x".repeat(crate::models::requests::MAX_VALUE_SIZE + 1);

        let result = create_handler(State(state), create_req(1, &big)).await;
        assert!(matches!(result, Err(ApiError::InvalidRequest(_))));
        assert_eq!(store.write_count(), 0);
    }
}
