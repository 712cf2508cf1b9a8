//! Integration Tests for the peer protocol
//!
//! Runs several nodes on ephemeral local ports and checks that keys are
//! loaded by their owner and fetched over HTTP by everyone else.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use peercache::peers::protocol::{decode_response, CONTENT_TYPE};
use peercache::{
    peer_router, CacheError, Group, GroupRegistry, HttpPool, LoaderFn, PeerPicker,
};
use tokio::net::TcpListener;
use tokio::time::timeout;
use tokio_test::{assert_err, assert_ok};

// == Helper Functions ==

struct Node {
    addr: String,
    pool: Arc<HttpPool>,
    group: Arc<Group>,
    loads: Arc<AtomicUsize>,
}

/// Binds a listener first so the node knows its own peer id.
async fn bind() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = format!("http://{}", listener.local_addr().unwrap());
    (listener, addr)
}

/// Starts a node serving group `scores`. Its loader tags values with the
/// node's address so tests can tell who loaded them.
fn start(listener: TcpListener, addr: String, peers: &[String]) -> Node {
    let loads = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&loads);
    let tag = addr.clone();

    let mut registry = GroupRegistry::new();
    let group = registry
        .register(Group::new(
            "scores",
            2 << 10,
            LoaderFn(move |key: &str| {
                counter.fetch_add(1, Ordering::SeqCst);
                if key.starts_with("missing") {
                    return Err(CacheError::KeyNotFound(format!("{} not exist", key)));
                }
                Ok(format!("{}@{}", key, tag).into_bytes())
            }),
        ))
        .unwrap();
    let registry = Arc::new(registry);

    let pool = Arc::new(HttpPool::new(addr.clone()));
    pool.set(peers.iter().cloned());
    group.register_peers(pool.clone());

    let app = peer_router(Arc::clone(&pool), registry);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Node {
        addr,
        pool,
        group,
        loads,
    }
}

async fn start_pair() -> (Node, Node) {
    let (l1, a1) = bind().await;
    let (l2, a2) = bind().await;
    let peers = vec![a1.clone(), a2.clone()];
    (start(l1, a1, &peers), start(l2, a2, &peers))
}

/// First key of the form `<prefix><n>` that `node` routes to a remote peer.
fn remote_key(node: &Node, prefix: &str) -> String {
    (0..10_000)
        .map(|i| format!("{}{}", prefix, i))
        .find(|key| node.pool.pick_peer(key).is_some())
        .expect("some key should belong to the other peer")
}

/// First key of the form `<prefix><n>` that `node` owns itself.
fn local_key(node: &Node, prefix: &str) -> String {
    (0..10_000)
        .map(|i| format!("{}{}", prefix, i))
        .find(|key| node.pool.pick_peer(key).is_none())
        .expect("some key should belong to this peer")
}

// == Routing Tests ==

#[tokio::test]
async fn test_remote_key_loaded_by_owner() {
    let (n1, n2) = start_pair().await;
    let key = remote_key(&n1, "user-");

    let value = assert_ok!(n1.group.get(&key).await);
    assert_eq!(value.to_vec(), format!("{}@{}", key, n2.addr).into_bytes());

    assert_eq!(n1.loads.load(Ordering::SeqCst), 0);
    assert_eq!(n2.loads.load(Ordering::SeqCst), 1);

    // The owner caches, the requester does not.
    assert_eq!(n1.group.cache_stats().items, 0);
    assert_eq!(n2.group.cache_stats().items, 1);
    assert_eq!(n1.group.stats().peer_loads, 1);
}

#[tokio::test]
async fn test_repeated_remote_reads_hit_owner_cache() {
    let (n1, n2) = start_pair().await;
    let key = remote_key(&n1, "user-");

    for _ in 0..3 {
        assert_ok!(n1.group.get(&key).await);
    }

    assert_eq!(n2.loads.load(Ordering::SeqCst), 1);
    assert_eq!(n2.group.stats().cache_hits, 2);
    assert_eq!(n1.group.stats().peer_loads, 3);
}

#[tokio::test]
async fn test_local_key_loaded_locally() {
    let (n1, n2) = start_pair().await;
    let key = local_key(&n1, "user-");

    let value = assert_ok!(n1.group.get(&key).await);
    assert_eq!(value.to_vec(), format!("{}@{}", key, n1.addr).into_bytes());
    assert_eq!(n1.loads.load(Ordering::SeqCst), 1);
    assert_eq!(n2.loads.load(Ordering::SeqCst), 0);
    assert_eq!(n1.group.cache_stats().items, 1);
}

#[tokio::test]
async fn test_both_nodes_agree_on_owner() {
    let (n1, n2) = start_pair().await;

    for i in 0..50 {
        let key = format!("agree-{}", i);
        let v1 = assert_ok!(n1.group.get(&key).await);
        let v2 = assert_ok!(n2.group.get(&key).await);
        assert_eq!(v1.to_vec(), v2.to_vec());
    }

    // Every key was loaded exactly once across the fleet.
    let total = n1.loads.load(Ordering::SeqCst) + n2.loads.load(Ordering::SeqCst);
    assert_eq!(total, 50);
}

#[tokio::test]
async fn test_concurrent_remote_reads_single_request() {
    let (n1, n2) = start_pair().await;
    let key = remote_key(&n1, "hot-");

    let results = join_all((0..20).map(|_| n1.group.get(&key))).await;
    for result in results {
        let value = assert_ok!(result);
        assert_eq!(value.to_vec(), format!("{}@{}", key, n2.addr).into_bytes());
    }

    // One flight on the requester means one HTTP request to the owner.
    let stats = n1.group.stats();
    assert_eq!(stats.loads_deduped, 1);
    assert_eq!(stats.peer_loads, 1);
    assert_eq!(n2.group.stats().gets, 1);
    assert_eq!(n2.loads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_key_needing_escape() {
    let (n1, n2) = start_pair().await;
    let key = remote_key(&n1, "a b/c?d#");

    let value = assert_ok!(n1.group.get(&key).await);
    assert_eq!(value.to_vec(), format!("{}@{}", key, n2.addr).into_bytes());
}

#[tokio::test]
async fn test_single_node_with_trailing_slash_id_loads_locally() {
    let (listener, addr) = bind().await;
    let node = start(listener, format!("{}/", addr), &[addr.clone()]);

    let value = assert_ok!(
        timeout(Duration::from_secs(5), node.group.get("Tom"))
            .await
            .expect("a node must not wait on itself")
    );
    assert_eq!(value.to_vec(), format!("Tom@{}/", addr).into_bytes());

    let stats = node.group.stats();
    assert_eq!(stats.peer_loads, 0);
    assert_eq!(stats.local_loads, 1);
}

// == Error Tests ==

#[tokio::test]
async fn test_remote_loader_error_falls_back_to_local() {
    let (n1, n2) = start_pair().await;
    let key = remote_key(&n1, "missing-");

    let err = assert_err!(n1.group.get(&key).await);
    assert!(matches!(err, CacheError::KeyNotFound(_)));

    // Owner failed with 500, so the requester tried its own loader too.
    assert_eq!(n2.loads.load(Ordering::SeqCst), 1);
    assert_eq!(n1.loads.load(Ordering::SeqCst), 1);
    assert_eq!(n1.group.stats().peer_errors, 1);
}

#[tokio::test]
async fn test_dead_peer_falls_back_to_local() {
    let (listener, addr) = bind().await;
    // Nothing listens on port 9.
    let dead = "http://127.0.0.1:9".to_string();
    let node = start(listener, addr.clone(), &[addr.clone(), dead]);
    let key = remote_key(&node, "user-");

    let value = assert_ok!(node.group.get(&key).await);
    assert_eq!(value.to_vec(), format!("{}@{}", key, addr).into_bytes());

    let stats = node.group.stats();
    assert_eq!(stats.peer_errors, 1);
    assert_eq!(stats.local_loads, 1);
    assert_eq!(node.group.cache_stats().items, 1);
}

// == Wire Format Tests ==

#[tokio::test]
async fn test_raw_http_request() {
    let (n1, _n2) = start_pair().await;
    let client = reqwest::Client::new();
    let key = local_key(&n1, "user-");

    let response = client
        .get(format!("{}/_peercache/scores/{}", n1.addr, key))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(
        response.headers()[reqwest::header::CONTENT_TYPE],
        CONTENT_TYPE
    );

    let body = response.bytes().await.unwrap();
    let value = assert_ok!(decode_response(&body));
    assert_eq!(value, format!("{}@{}", key, n1.addr).into_bytes());
}

#[tokio::test]
async fn test_raw_http_errors() {
    let (n1, _n2) = start_pair().await;
    let client = reqwest::Client::new();

    let status = |path: &'static str| {
        let client = client.clone();
        let url = format!("{}{}", n1.addr, path);
        async move { client.get(url).send().await.unwrap().status() }
    };

    assert_eq!(status("/_peercache/users/Tom").await, 404);
    assert_eq!(status("/_peercache/scores").await, 400);
    assert_eq!(status("/elsewhere/scores/Tom").await, 400);
    assert_eq!(status("/_peercache/scores/missing-1").await, 500);
}
