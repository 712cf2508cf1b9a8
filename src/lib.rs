//! Peercache - A peer-to-peer read-through cache
//!
//! Caches the results of an expensive lookup under a byte budget, spreads
//! keys across a fleet of identical processes with consistent hashing, and
//! collapses concurrent lookups of one key into a single load.

pub mod api;
pub mod cache;
pub mod config;
pub mod consistenthash;
pub mod error;
pub mod group;
pub mod models;
pub mod peers;
pub mod singleflight;

pub use api::AppState;
pub use cache::ByteView;
pub use config::Config;
pub use error::{CacheError, Result};
pub use group::{Group, GroupRegistry, Loader, LoaderFn};
pub use peers::{peer_router, HttpPool, PeerGetter, PeerPicker};
