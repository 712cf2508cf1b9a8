//! Cache Module
//!
//! Provides the byte-bounded LRU store and its concurrent wrapper.

mod byteview;
mod lru;
mod stats;
mod store;


// Re-export public types
pub use byteview::ByteView;
pub use lru::{LruStore, OnEvicted};
pub use stats::CacheStats;
pub use store::ConcurrentCache;
