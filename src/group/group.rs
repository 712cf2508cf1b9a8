//! Cache Group
//!
//! A named cache namespace implementing the read-through path: local cache
//! first, then a single deduplicated load that goes either to the peer that
//! owns the key or to the local data loader.

use std::fmt;
use std::sync::{Arc, OnceLock};

use tracing::{debug, warn};

use crate::cache::{ByteView, CacheStats, ConcurrentCache};
use crate::error::{CacheError, Result};
use crate::group::{GroupStats, GroupStatsSnapshot, Loader};
use crate::peers::{PeerGetter, PeerPicker};
use crate::singleflight::SingleFlight;

// == Group ==
pub struct Group {
    name: String,
    loader: Box<dyn Loader>,
    /// Values this process owns
    main_cache: ConcurrentCache,
    /// Bound once by `register_peers`
    peers: OnceLock<Arc<dyn PeerPicker>>,
    flight: SingleFlight<ByteView>,
    stats: GroupStats,
}

impl Group {
    // == Constructor ==
    /// Creates a group holding at most `cache_bytes` of keys and values
    /// (0 = unbounded), filled by `loader` on a miss.
    pub fn new(name: impl Into<String>, cache_bytes: usize, loader: impl Loader + 'static) -> Self {
        Self {
            name: name.into(),
            loader: Box::new(loader),
            main_cache: ConcurrentCache::new(cache_bytes),
            peers: OnceLock::new(),
            flight: SingleFlight::new(),
            stats: GroupStats::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    // == Register Peers ==
    /// Binds the peer-picking strategy used to route misses.
    ///
    /// # Panics
    /// If called more than once: a group serves one topology for its
    /// whole lifetime.
    pub fn register_peers(&self, peers: Arc<dyn PeerPicker>) {
        if self.peers.set(peers).is_err() {
            panic!("register_peers called more than once on group {}", self.name);
        }
    }

    // == Get ==
    /// Returns the value for `key`, loading it on a miss.
    pub async fn get(&self, key: &str) -> Result<ByteView> {
        self.stats.record_get();
        if key.is_empty() {
            return Err(CacheError::InvalidRequest("key is required".to_string()));
        }

        if let Some(value) = self.main_cache.get(key) {
            self.stats.record_cache_hit();
            debug!(group = %self.name, key, "Cache hit");
            return Ok(value);
        }

        self.load(key).await
    }

    // == Load ==
    /// Loads `key` once for all concurrent callers.
    async fn load(&self, key: &str) -> Result<ByteView> {
        self.stats.record_load();
        self.flight
            .call(key, || async {
                // A flight for this key may have filled the cache between
                // our miss and taking the lead.
                if let Some(value) = self.main_cache.get_again(key) {
                    self.stats.record_cache_hit();
                    return Ok(value);
                }
                self.stats.record_load_deduped();

                if let Some(peer) = self.peers.get().and_then(|picker| picker.pick_peer(key)) {
                    match self.get_from_peer(peer.as_ref(), key).await {
                        Ok(value) => {
                            self.stats.record_peer_load();
                            return Ok(value);
                        }
                        Err(err) => {
                            self.stats.record_peer_error();
                            warn!(group = %self.name, key, error = %err, "Peer fetch failed, loading locally");
                        }
                    }
                }

                self.get_locally(key).await
            })
            .await
    }

    async fn get_locally(&self, key: &str) -> Result<ByteView> {
        debug!(group = %self.name, key, "Loading from data loader");
        match self.loader.load(key).await {
            Ok(bytes) => {
                self.stats.record_local_load();
                let value = ByteView::from(bytes);
                self.populate_cache(key, value.clone());
                Ok(value)
            }
            Err(err) => {
                self.stats.record_local_load_err();
                Err(err)
            }
        }
    }

    /// Values fetched from a peer are not cached here; the owner caches them.
    async fn get_from_peer(&self, peer: &dyn PeerGetter, key: &str) -> Result<ByteView> {
        let bytes = peer.get(&self.name, key).await?;
        Ok(ByteView::from(bytes))
    }

    fn populate_cache(&self, key: &str, value: ByteView) {
        self.main_cache.add(key, value);
    }

    // == Stats ==
    pub fn stats(&self) -> GroupStatsSnapshot {
        self.stats.snapshot()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.main_cache.stats()
    }
}

impl fmt::Debug for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Group")
            .field("name", &self.name)
            .field("cache_bytes", &self.main_cache.cache_bytes())
            .field("has_peers", &self.peers.get().is_some())
            .finish()
    }
}
