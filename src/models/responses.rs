//! Response DTOs for the demo server API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::cache::CacheStats;

/// Body of `GET /api/items/:id`
#[derive(Debug, Clone, Serialize)]
pub struct ItemResponse {
    pub id: u64,
    pub name: String,
    /// When the handler produced this body, so cached copies are recognizable
    pub generated_at: String,
}

impl ItemResponse {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            name: format!("item-{id}"),
            generated_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Response body for the group clear endpoint (POST /api/clear/:group)
#[derive(Debug, Clone, Serialize)]
pub struct ClearResponse {
    /// Success message
    pub message: String,
    /// The group that was expired
    pub group: String,
}

impl ClearResponse {
    pub fn new(group: impl Into<String>) -> Self {
        let group = group.into();
        Self {
            message: format!("Group '{}' cleared", group),
            group,
        }
    }
}

/// Response body for the stats endpoint (GET /stats)
///
/// Counters are only tracked by the memory backend; other backends
/// report zeros.
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Name of the active storage backend
    pub backend: String,
    /// Number of cache hits
    pub hits: u64,
    /// Number of cache misses
    pub misses: u64,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
    /// Number of LRU evictions
    pub evictions: u64,
    /// Number of entries removed by group expiry
    pub group_deletions: u64,
    /// Current number of entries in cache
    pub total_entries: usize,
    /// Sum of entry lengths
    pub total_size: usize,
}

impl StatsResponse {
    /// Creates a new StatsResponse from cache statistics
    pub fn new(backend: impl Into<String>, stats: &CacheStats) -> Self {
        Self {
            backend: backend.into(),
            hits: stats.hits,
            misses: stats.misses,
            hit_rate: stats.hit_rate(),
            evictions: stats.evictions,
            group_deletions: stats.group_deletions,
            total_entries: stats.total_entries,
            total_size: stats.total_size,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    pub backend: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy(backend: impl Into<String>) -> Self {
        Self {
            status: "healthy".to_string(),
            backend: backend.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for handler-level failures
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
    fn test_clear_response_serialize() {
        let resp = ClearResponse::new("books");
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains(r#""group":"books""#));
        assert!(json.contains("cleared"));
    }

    #[test]
    fn test_stats_response_from_cache_stats() {
        let stats = CacheStats {
            hits: 80,
            misses: 20,
            evictions: 5,
            group_deletions: 3,
            total_entries: 100,
            total_size: 2048,
        };
        let resp = StatsResponse::new("memory", &stats);
        assert_eq!(resp.backend, "memory");
        assert!((resp.hit_rate - 0.8).abs() < 0.001);
        assert_eq!(resp.group_deletions, 3);
    }

    #[test]
    fn test_stats_response_zero_requests() {
        let resp = StatsResponse::new("redis", &CacheStats::default());
        assert_eq!(resp.hit_rate, 0.0);
    }

    #[test]
    fn test_health_response_serialize() {
        let resp = HealthResponse::healthy("memory");
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("timestamp"));
    }

    #[test]
    fn test_item_response_name() {
        assert_eq!(ItemResponse::new(7).name, "item-7");
    }

    #[test]
    fn test_error_response_serialize() {
        let json = serde_json::to_string(&ErrorResponse::new("Item not found")).unwrap();
        assert_eq!(json, r#"{"error":"Item not found"}"#);
    }
}
