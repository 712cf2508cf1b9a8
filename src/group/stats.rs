//! Group Statistics Module
//!
//! Counters describing how a group's reads were served.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Group Stats ==
/// Live counters, updated without locking.
#[derive(Debug, Default)]
pub struct GroupStats {
    /// Any `get` request, including those served from the cache
    gets: AtomicU64,
    /// Requests answered by the local cache
    cache_hits: AtomicU64,
    /// Values fetched from a remote peer
    peer_loads: AtomicU64,
    /// Remote peer fetches that failed
    peer_errors: AtomicU64,
    /// Cache misses, before deduplication
    loads: AtomicU64,
    /// Cache misses that actually ran after deduplication
    loads_deduped: AtomicU64,
    /// Successful loader calls
    local_loads: AtomicU64,
    /// Failed loader calls
    local_load_errs: AtomicU64,
}

/// Serializable copy of [`GroupStats`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GroupStatsSnapshot {
    pub gets: u64,
    pub cache_hits: u64,
    pub peer_loads: u64,
    pub peer_errors: u64,
    pub loads: u64,
    pub loads_deduped: u64,
    pub local_loads: u64,
    pub local_load_errs: u64,
}

impl GroupStats {
    pub fn record_get(&self) {
        self.gets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_peer_load(&self) {
        self.peer_loads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_peer_error(&self) {
        self.peer_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_load(&self) {
        self.loads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_load_deduped(&self) {
        self.loads_deduped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_local_load(&self) {
        self.local_loads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_local_load_err(&self) {
        self.local_load_errs.fetch_add(1, Ordering::Relaxed);
    }

    // == Snapshot ==
    /// Reads every counter.
    pub fn snapshot(&self) -> GroupStatsSnapshot {
        GroupStatsSnapshot {
            gets: self.gets.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            peer_loads: self.peer_loads.load(Ordering::Relaxed),
            peer_errors: self.peer_errors.load(Ordering::Relaxed),
            loads: self.loads.load(Ordering::Relaxed),
            loads_deduped: self.loads_deduped.load(Ordering::Relaxed),
            local_loads: self.local_loads.load(Ordering::Relaxed),
            local_load_errs: self.local_load_errs.load(Ordering::Relaxed),
        }
    }
}
