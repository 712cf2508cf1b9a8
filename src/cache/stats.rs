//! Cache Statistics Module
//!
//! Snapshot of a concurrent cache's size and hit counters.

use serde::Serialize;

// == Cache Stats ==
/// Point-in-time statistics of a [`crate::cache::ConcurrentCache`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Bytes charged against the budget (keys + values)
    pub bytes: usize,
    /// Number of entries held
    pub items: usize,
    /// Number of lookups
    pub gets: u64,
    /// Number of lookups that found a value
    pub hits: u64,
    /// Number of entries evicted to respect the budget
    pub evictions: u64,
}

impl CacheStats {
    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / gets, or 0.0 if no lookups have been made.
    pub fn hit_rate(&self) -> f64 {
        if self.gets == 0 {
            0.0
        } else {
            self.hits as f64 / self.gets as f64
        }
    }

    /// Number of lookups that found nothing.
    pub fn misses(&self) -> u64 {
        self.gets.saturating_sub(self.hits)
    }
}
