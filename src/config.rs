//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;

use crate::consistenthash::DEFAULT_REPLICAS;
use crate::peers::{normalize_peer_id, DEFAULT_BASE_PATH};

const DEFAULT_PORT: u16 = 8001;
const DEFAULT_PEERS: &str = "http://localhost:8001,http://localhost:8002,http://localhost:8003";

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port of the peer protocol server
    pub cache_port: u16,
    /// This process's peer id
    pub self_addr: String,
    /// Every peer id in the fleet, including this one
    pub peer_addrs: Vec<String>,
    /// Path prefix of the peer protocol
    pub base_path: String,
    /// Virtual ring positions per peer
    pub replicas: usize,
    /// Byte budget of the demo group (0 = unbounded)
    pub cache_bytes: usize,
    /// Name of the demo group
    pub group_name: String,
    /// Whether to start the front-end endpoint
    pub api_enabled: bool,
    /// Port of the front-end endpoint
    pub api_port: u16,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_PORT` - Peer server port (default: 8001)
    /// - `SELF_ADDR` - This peer's id (default: `http://localhost:<CACHE_PORT>`)
    /// - `PEER_ADDRS` - Comma separated peer ids (default: localhost 8001-8003)
    /// - `BASE_PATH` - Peer protocol prefix (default: `/_peercache/`)
    /// - `REPLICAS` - Virtual nodes per peer (default: 50)
    /// - `CACHE_BYTES` - Group byte budget (default: 2048)
    /// - `GROUP_NAME` - Demo group name (default: `scores`)
    /// - `API_ENABLED` - Start the front-end endpoint (default: false)
    /// - `API_PORT` - Front-end port (default: 9999)
    pub fn from_env() -> Self {
        let cache_port = parse_var("CACHE_PORT").unwrap_or(DEFAULT_PORT);

        Self {
            cache_port,
            self_addr: env::var("SELF_ADDR")
                .map(|addr| normalize_peer_id(&addr))
                .unwrap_or_else(|_| format!("http://localhost:{}", cache_port)),
            peer_addrs: split_peers(
                &env::var("PEER_ADDRS").unwrap_or_else(|_| DEFAULT_PEERS.to_string()),
            ),
            base_path: env::var("BASE_PATH").unwrap_or_else(|_| DEFAULT_BASE_PATH.to_string()),
            replicas: parse_var("REPLICAS").unwrap_or(DEFAULT_REPLICAS),
            cache_bytes: parse_var("CACHE_BYTES").unwrap_or(2 << 10),
            group_name: env::var("GROUP_NAME").unwrap_or_else(|_| "scores".to_string()),
            api_enabled: parse_var("API_ENABLED").unwrap_or(false),
            api_port: parse_var("API_PORT").unwrap_or(9999),
        }
    }
}

impl Config {
    /// Whether this process's own id is part of the peer list.
    pub fn self_in_peers(&self) -> bool {
        self.peer_addrs.contains(&self.self_addr)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_port: DEFAULT_PORT,
            self_addr: format!("http://localhost:{}", DEFAULT_PORT),
            peer_addrs: split_peers(DEFAULT_PEERS),
            base_path: DEFAULT_BASE_PATH.to_string(),
            replicas: DEFAULT_REPLICAS,
            cache_bytes: 2 << 10,
            group_name: "scores".to_string(),
            api_enabled: false,
            api_port: 9999,
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

fn split_peers(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|peer| !peer.is_empty())
        .map(normalize_peer_id)
        .collect()
}
