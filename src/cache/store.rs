//! Concurrent Cache Module
//!
//! Mutex-guarded, lazily built wrapper around [`LruStore`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::cache::{ByteView, CacheStats, LruStore};

// == Concurrent Cache ==
/// Byte-bounded LRU cache safe for use from many tasks.
///
/// The underlying store is only allocated on the first `add`. The lock is
/// held for the duration of a single store operation and never across an
/// `.await`.
#[derive(Debug)]
pub struct ConcurrentCache {
    /// Budget handed to the store on creation
    cache_bytes: usize,
    /// Lazily created store
    lru: Mutex<Option<LruStore>>,
    gets: AtomicU64,
    hits: AtomicU64,
    /// Shared with the store's eviction callback
    evictions: Arc<AtomicU64>,
}

impl ConcurrentCache {
    // == Constructor ==
    /// Creates an empty cache with a byte budget (0 = unbounded).
    pub fn new(cache_bytes: usize) -> Self {
        Self {
            cache_bytes,
            lru: Mutex::new(None),
            gets: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            evictions: Arc::new(AtomicU64::new(0)),
        }
    }

    // == Add ==
    /// Stores a value, evicting older entries if the budget is exceeded.
    pub fn add(&self, key: &str, value: ByteView) {
        let mut lru = self.lru.lock();
        let store = lru.get_or_insert_with(|| {
            let evictions = Arc::clone(&self.evictions);
            LruStore::with_eviction_callback(
                self.cache_bytes,
                Box::new(move |key: &str, value: &ByteView| {
                    evictions.fetch_add(1, Ordering::Relaxed);
                    debug!(key, bytes = value.len(), "Evicted cache entry");
                }),
            )
        });
        store.put(key.to_string(), value);
    }

    // == Get ==
    /// Looks up a value; a hit marks the entry as most recently used.
    pub fn get(&self, key: &str) -> Option<ByteView> {
        self.gets.fetch_add(1, Ordering::Relaxed);
        self.lookup(key)
    }

    /// Repeats a lookup already counted by [`get`](Self::get): a hit is
    /// recorded, the lookup itself is not.
    pub fn get_again(&self, key: &str) -> Option<ByteView> {
        self.lookup(key)
    }

    fn lookup(&self, key: &str) -> Option<ByteView> {
        let value = self.lru.lock().as_mut()?.get(key)?;
        self.hits.fetch_add(1, Ordering::Relaxed);
        Some(value)
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let (bytes, items) = self
            .lru
            .lock()
            .as_ref()
            .map(|store| (store.used_bytes(), store.len()))
            .unwrap_or_default();

        CacheStats {
            bytes,
            items,
            gets: self.gets.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    /// Returns the configured byte budget.
    pub fn cache_bytes(&self) -> usize {
        self.cache_bytes
    }
}

impl Default for ConcurrentCache {
    fn default() -> Self {
        Self::new(0)
    }
}
