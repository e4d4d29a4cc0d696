//! Response DTOs for the key-value server API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::cache::CacheStats;

/// Where a read was answered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadSource {
    Cache,
    Store,
}

/// Response body for the read operation (GET /read/:key)
#[derive(Debug, Clone, Serialize)]
pub struct ReadResponse {
    /// The requested key
    pub key: i64,
    /// The stored value
    pub value: String,
    /// Whether the cache or the store answered
    pub source: ReadSource,
}

impl ReadResponse {
    pub fn new(key: i64, value: impl Into<String>, source: ReadSource) -> Self {
        Self {
            key,
            value: value.into(),
            source,
        }
    }
}

/// Response body for the create-or-update operation (POST /create)
#[derive(Debug, Clone, Serialize)]
pub struct CreateResponse {
    /// Success message
    pub message: String,
    /// The key that was stored
    pub key: i64,
}

impl CreateResponse {
    pub fn new(key: i64) -> Self {
        Self {
            message: format!("Key {} stored successfully", key),
            key,
        }
    }
}

/// Response body for the delete operation (DELETE /delete/:key)
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    /// Success message
    pub message: String,
    /// The key that was deleted
    pub key: i64,
}

impl DeleteResponse {
    pub fn new(key: i64) -> Self {
        Self {
            message: format!("Key {} deleted successfully", key),
            key,
        }
    }
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Number of cache hits
    pub hits: u64,
    /// Number of cache misses
    pub misses: u64,
    /// Number of evictions
    pub evictions: u64,
    /// Current number of entries in cache
    pub total_entries: usize,
    /// Configured cache capacity
    pub capacity: usize,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
}

impl From<CacheStats> for StatsResponse {
    fn from(stats: CacheStats) -> Self {
        Self {
            hit_rate: stats.hit_rate(),
            hits: stats.hits,
            misses: stats.misses,
            evictions: stats.evictions,
            total_entries: stats.total_entries,
            capacity: stats.capacity,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// "healthy" or "degraded"
    pub status: String,
    /// Whether the durable store answered a ping
    pub store_reachable: bool,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    pub fn new(store_reachable: bool) -> Self {
        let status = if store_reachable { "healthy" } else { "degraded" };
        Self {
            status: status.to_string(),
            store_reachable,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.store_reachable
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_response_serialize() {
        let resp = ReadResponse::new(7, "seven", ReadSource::Store);
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["key"], 7);
        assert_eq!(json["value"], "seven");
        assert_eq!(json["source"], "store");
    }

    #[test]
    fn test_create_response_serialize() {
        let json = serde_json::to_string(&CreateResponse::new(12)).unwrap();
        assert!(json.contains("12"));
        assert!(json.contains("successfully"));
    }

    #[test]
    fn test_delete_response_serialize() {
        let json = serde_json::to_string(&DeleteResponse::new(3)).unwrap();
        assert!(json.contains("deleted"));
    }

    #[test]
    fn test_stats_response_from_cache_stats() {
        let stats = CacheStats {
            hits: 80,
            misses: 20,
            evictions: 5,
            total_entries: 50,
            capacity: 100,
        };
        let resp = StatsResponse::from(stats);
        assert!((resp.hit_rate - 0.8).abs() < 0.001);
        assert_eq!(resp.capacity, 100);
    }

    #[test]
    fn test_health_response() {
        let healthy = HealthResponse::new(true);
        assert_eq!(healthy.status, "healthy");
        assert!(healthy.is_healthy());

        let degraded = HealthResponse::new(false);
        assert_eq!(degraded.status, "degraded");
        let json = serde_json::to_string(&degraded).unwrap();
        assert!(json.contains("timestamp"));
    }

    #[test]
    fn test_error_response_serialize() {
        let json = serde_json::to_string(&ErrorResponse::new("Something went wrong")).unwrap();
        assert!(json.contains("error"));
        assert!(json.contains("Something went wrong"));
    }
}
