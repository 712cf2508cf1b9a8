//! HTTP Peer Pool
//!
//! Tracks the peer set on a consistent hash ring, picks the owner of a key,
//! and serves the server side of the wire protocol.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Router,
};
use parking_lot::Mutex;
use percent_encoding::percent_decode_str;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::consistenthash::{HashFn, HashRing, DEFAULT_REPLICAS};
use crate::error::{CacheError, Result};
use crate::group::GroupRegistry;
use crate::peers::protocol;
use crate::peers::{HttpGetter, PeerGetter, PeerPicker};

/// Path prefix of the wire protocol.
pub const DEFAULT_BASE_PATH: &str = "/_peercache/";

// == Pool Options ==
/// Settings shared by every peer in a fleet.
#[derive(Clone)]
pub struct PoolOptions {
    /// Path prefix, starting and ending with `/`
    pub base_path: String,
    /// Virtual nodes per peer
    pub replicas: usize,
    /// Ring hash, `None` for the default
    pub hash_fn: Option<HashFn>,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            base_path: DEFAULT_BASE_PATH.to_string(),
            replicas: DEFAULT_REPLICAS,
            hash_fn: None,
        }
    }
}

impl fmt::Debug for PoolOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolOptions")
            .field("base_path", &self.base_path)
            .field("replicas", &self.replicas)
            .field("custom_hash", &self.hash_fn.is_some())
            .finish()
    }
}

// == Pool State ==
/// Ring and clients, replaced together by `set`.
#[derive(Debug)]
struct PoolState {
    ring: HashRing,
    getters: HashMap<String, Arc<HttpGetter>>,
}

// == HTTP Pool ==
/// Peer picker for a fleet of processes speaking the HTTP wire protocol.
#[derive(Debug)]
pub struct HttpPool {
    /// This process's peer id, e.g. `http://10.0.0.1:8001`
    self_id: String,
    options: PoolOptions,
    client: reqwest::Client,
    state: Mutex<PoolState>,
}

impl HttpPool {
    // == Constructor ==
    /// Creates a pool with the default base path and replica count.
    pub fn new(self_id: impl Into<String>) -> Self {
        Self::with_options(self_id, PoolOptions::default())
    }

    pub fn with_options(self_id: impl Into<String>, options: PoolOptions) -> Self {
        let ring = Self::build_ring(&options);
        Self {
            self_id: normalize_peer_id(&self_id.into()),
            options,
            client: reqwest::Client::new(),
            state: Mutex::new(PoolState {
                ring,
                getters: HashMap::new(),
            }),
        }
    }

    pub fn self_id(&self) -> &str {
        &self.self_id
    }

    pub fn base_path(&self) -> &str {
        &self.options.base_path
    }

    // == Set ==
    /// Replaces the peer set: a new ring and one client per peer.
    ///
    /// The list should include this process's own id.
    pub fn set<I, S>(&self, peers: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let peers: Vec<String> = peers
            .into_iter()
            .map(|peer| normalize_peer_id(&peer.into()))
            .collect();

        let mut ring = Self::build_ring(&self.options);
        ring.add(&peers);
        let getters = peers
            .iter()
            .map(|peer| {
                let base_url = format!("{}{}", peer, self.options.base_path);
                (
                    peer.clone(),
                    Arc::new(HttpGetter::new(base_url, self.client.clone())),
                )
            })
            .collect();

        *self.state.lock() = PoolState { ring, getters };
        info!(server = %self.self_id, peers = ?peers, "Peer set updated");
    }

    fn build_ring(options: &PoolOptions) -> HashRing {
        match &options.hash_fn {
            Some(hash_fn) => HashRing::with_hasher(options.replicas, Arc::clone(hash_fn)),
            None => HashRing::new(options.replicas),
        }
    }
}

// == Peer Picker Implementation ==
impl PeerPicker for HttpPool {
    fn pick_peer(&self, key: &str) -> Option<Arc<dyn PeerGetter>> {
        let state = self.state.lock();
        let peer = state.ring.get(key)?;
        if peer == self.self_id {
            return None;
        }

        debug!(server = %self.self_id, peer, key, "Pick peer");
        state
            .getters
            .get(peer)
            .map(|getter| Arc::clone(getter) as Arc<dyn PeerGetter>)
    }
}

/// Canonical form of a peer id: no surrounding whitespace, no trailing `/`.
///
/// `pick_peer` compares ids by string, so this process's own id and its
/// ring entry must be written the same way.
pub fn normalize_peer_id(id: &str) -> String {
    id.trim().trim_end_matches('/').to_string()
}

// == Server Side ==
#[derive(Clone)]
struct PeerServerState {
    pool: Arc<HttpPool>,
    registry: Arc<GroupRegistry>,
}

/// Creates the router serving `GET <base_path><group>/<key>`.
///
/// Every path is routed to the protocol handler, which rejects paths
/// outside the base path itself.
pub fn peer_router(pool: Arc<HttpPool>, registry: Arc<GroupRegistry>) -> Router {
    Router::new()
        .fallback(serve_peer)
        .layer(TraceLayer::new_for_http())
        .with_state(PeerServerState { pool, registry })
}

async fn serve_peer(
    State(state): State<PeerServerState>,
    method: Method,
    uri: Uri,
) -> Response {
    let pool = &state.pool;
    info!(server = %pool.self_id, %method, path = uri.path(), "Peer request");

    if method != Method::GET {
        return (StatusCode::METHOD_NOT_ALLOWED, "method not allowed").into_response();
    }

    let (group_name, key) = match parse_peer_path(pool.base_path(), uri.path()) {
        Ok(parts) => parts,
        Err(err) => {
            warn!(server = %pool.self_id, error = %err, "Rejected peer request");
            return (StatusCode::BAD_REQUEST, err.to_string()).into_response();
        }
    };

    let Some(group) = state.registry.get(&group_name) else {
        let err = CacheError::NoSuchGroup(group_name);
        return (err.status_code(), err.to_string()).into_response();
    };

    match group.get(&key).await {
        Ok(view) => (
            [(header::CONTENT_TYPE, protocol::CONTENT_TYPE)],
            protocol::encode_response(view.as_ref()),
        )
            .into_response(),
        Err(err) => (err.status_code(), err.to_string()).into_response(),
    }
}

/// Splits `<base_path><group>/<key>` into its decoded segments.
pub(crate) fn parse_peer_path(base_path: &str, path: &str) -> Result<(String, String)> {
    let rest = path
        .strip_prefix(base_path)
        .ok_or_else(|| CacheError::InvalidRequest(format!("unexpected path: {}", path)))?;

    let (group, key) = rest
        .split_once('/')
        .ok_or_else(|| CacheError::InvalidRequest(format!("bad request: {}", path)))?;

    Ok((decode_segment(group)?, decode_segment(key)?))
}

fn decode_segment(segment: &str) -> Result<String> {
    percent_decode_str(segment)
        .decode_utf8()
        .map(|s| s.into_owned())
        .map_err(|e| CacheError::InvalidRequest(format!("invalid path segment: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::{Group, LoaderFn};
    use axum::body::Body;
    use axum::http::Request;
    use tower::util::ServiceExt;

    const SELF_ID: &str = "http://localhost:8001";

    /// Maps "<digits>..." keys to their numeric prefix.
    fn numeric_hash() -> HashFn {
        Arc::new(|data: &[u8]| {
            let digits: String = data
                .iter()
                .map(|&b| b as char)
                .take_while(char::is_ascii_digit)
                .collect();
            digits.parse().unwrap_or(0)
        })
    }

    fn test_registry() -> Arc<GroupRegistry> {
        let mut registry = GroupRegistry::new();
        registry
            .register(Group::new(
                "scores",
                2 << 10,
                LoaderFn(|key: &str| match key {
                    "Tom" => Ok(b"630".to_vec()),
                    _ => Err(CacheError::KeyNotFound(format!("{} not exist", key))),
                }),
            ))
            .unwrap();
        Arc::new(registry)
    }

    fn test_app() -> Router {
        let pool = Arc::new(HttpPool::new(SELF_ID));
        peer_router(pool, test_registry())
    }

    async fn send(app: Router, method: Method, uri: &str) -> Response {
        app.oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
    }

    #[test]
    fn test_pick_peer_skips_self() {
        let pool = HttpPool::with_options(
            "1",
            PoolOptions {
                replicas: 1,
                hash_fn: Some(numeric_hash()),
                ..Default::default()
            },
        );
        // Virtual nodes: "01" -> 1, "02" -> 2
        pool.set(["1", "2"]);

        assert!(pool.pick_peer("1").is_none());
        assert!(pool.pick_peer("2").is_some());
        // Wraps around to the first node, owned by this process
        assert!(pool.pick_peer("3").is_none());
    }

    #[test]
    fn test_trailing_slash_self_id_is_never_picked() {
        let pool = HttpPool::new("http://localhost:8001/");
        pool.set(["http://localhost:8001"]);

        assert_eq!(pool.self_id(), "http://localhost:8001");
        for i in 0..100 {
            assert!(pool.pick_peer(&format!("key-{}", i)).is_none());
        }

        let pool = HttpPool::new("http://localhost:8001");
        pool.set(["http://localhost:8001/ "]);
        assert!(pool.pick_peer("Tom").is_none());
    }

    #[test]
    fn test_normalize_peer_id() {
        assert_eq!(normalize_peer_id(" http://a:1/ "), "http://a:1");
        assert_eq!(normalize_peer_id("http://a:1"), "http://a:1");
    }

    #[test]
    fn test_pick_peer_without_peers() {
        let pool = HttpPool::new(SELF_ID);
        assert!(pool.pick_peer("Tom").is_none());
    }

    #[test]
    fn test_set_replaces_peer_set() {
        let pool = HttpPool::new(SELF_ID);
        pool.set([SELF_ID, "http://localhost:8002"]);
        assert_eq!(pool.state.lock().getters.len(), 2);

        pool.set([SELF_ID]);
        assert_eq!(pool.state.lock().getters.len(), 1);
        for i in 0..100 {
            assert!(pool.pick_peer(&format!("key-{}", i)).is_none());
        }
    }

    #[test]
    fn test_getter_base_url() {
        let pool = HttpPool::new(SELF_ID);
        pool.set([SELF_ID, "http://localhost:8002"]);

        let state = pool.state.lock();
        assert_eq!(
            state.getters["http://localhost:8002"].base_url(),
            "http://localhost:8002/_peercache/"
        );
    }

    #[test]
    fn test_parse_peer_path() {
        assert_eq!(
            parse_peer_path("/_peercache/", "/_peercache/scores/Tom").unwrap(),
            ("scores".to_string(), "Tom".to_string())
        );
        assert_eq!(
            parse_peer_path("/_peercache/", "/_peercache/my%20group/a%2Fb").unwrap(),
            ("my group".to_string(), "a/b".to_string())
        );
        assert!(parse_peer_path("/_peercache/", "/other/scores/Tom").is_err());
        assert!(parse_peer_path("/_peercache/", "/_peercache/scores").is_err());
    }

    #[tokio::test]
    async fn test_serve_value() {
        let response = send(test_app(), Method::GET, "/_peercache/scores/Tom").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            protocol::CONTENT_TYPE
        );
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(protocol::decode_response(&body).unwrap(), b"630".to_vec());
    }

    #[tokio::test]
    async fn test_malformed_path() {
        let response = send(test_app(), Method::GET, "/_peercache/scores").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_wrong_prefix() {
        let response = send(test_app(), Method::GET, "/api/scores/Tom").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_group() {
        let response = send(test_app(), Method::GET, "/_peercache/nope/Tom").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_load_failure() {
        let response = send(test_app(), Method::GET, "/_peercache/scores/Unknown").await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_empty_key() {
        let response = send(test_app(), Method::GET, "/_peercache/scores/").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_non_get_method() {
        let response = send(test_app(), Method::POST, "/_peercache/scores/Tom").await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
