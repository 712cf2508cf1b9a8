//! Response DTOs for the front-end API
//!
//! Defines the structure of outgoing JSON response bodies.

use serde::Serialize;

use crate::cache::CacheStats;
use crate::group::{Group, GroupStatsSnapshot};

/// Statistics of one group
#[derive(Debug, Clone, Serialize)]
pub struct GroupStatsResponse {
    /// Group name
    pub name: String,
    /// Read path counters
    pub group: GroupStatsSnapshot,
    /// Local cache counters
    pub cache: CacheStats,
    /// Local cache hit rate
    pub hit_rate: f64,
}

impl GroupStatsResponse {
    /// Collects the statistics of a group
    pub fn from_group(group: &Group) -> Self {
        let cache = group.cache_stats();
        Self {
            name: group.name().to_string(),
            group: group.stats(),
            hit_rate: cache.hit_rate(),
            cache,
        }
    }
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// One entry per registered group, sorted by name
    pub groups: Vec<GroupStatsResponse>,
}

impl StatsResponse {
    pub fn new(mut groups: Vec<GroupStatsResponse>) -> Self {
        groups.sort_by(|a, b| a.name.cmp(&b.name));
        Self { groups }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
