//! Peers Module
//!
//! Routing of keys to the peer that owns them, and the HTTP transport used
//! to fetch a key from that peer.
//!
//! # Wire Protocol
//! - `GET <base_path><group>/<key>` with both segments percent-encoded
//! - `200` body: protobuf [`protocol::Response`], `application/octet-stream`
//! - `400` malformed path, `404` unknown group, `500` load failure

mod client;
mod pool;
pub mod protocol;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;

pub use client::HttpGetter;
pub use pool::{normalize_peer_id, peer_router, HttpPool, PoolOptions, DEFAULT_BASE_PATH};

// == Peer Picker ==
/// Locates the peer that owns a key.
pub trait PeerPicker: Send + Sync {
    /// Returns the owning peer, or `None` when the key is owned by this
    /// process (or no peers are known).
    fn pick_peer(&self, key: &str) -> Option<Arc<dyn PeerGetter>>;
}

// == Peer Getter ==
/// Client for one remote peer.
#[async_trait]
pub trait PeerGetter: Send + Sync {
    /// Fetches `key` from `group` on the remote peer.
    async fn get(&self, group: &str, key: &str) -> Result<Vec<u8>>;
}
