//! Peercache - A peer-to-peer read-through cache
//!
//! Demo node: serves the group `scores`, backed by a slow in-memory
//! "database", to the other peers and optionally to external clients.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use peercache::api::create_router;
use peercache::peers::PoolOptions;
use peercache::{peer_router, AppState, CacheError, Config, Group, GroupRegistry, HttpPool, LoaderFn};

/// Main entry point for a cache node.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Register the demo group backed by the slow database
/// 4. Build the peer pool and bind it to the group
/// 5. Start the front-end server if enabled
/// 6. Serve the peer protocol until SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "peercache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting peercache node");

    let config = Config::from_env();
    info!(
        "Configuration loaded: self={}, peers={:?}, base_path={}, replicas={}, cache_bytes={}",
        config.self_addr, config.peer_addrs, config.base_path, config.replicas, config.cache_bytes
    );

    if !config.self_in_peers() {
        warn!(
            self_addr = %config.self_addr,
            "SELF_ADDR is not listed in PEER_ADDRS"
        );
    }

    let mut registry = GroupRegistry::new();
    let group = registry.register(create_group(&config))?;
    let registry = Arc::new(registry);

    let pool = Arc::new(HttpPool::with_options(
        config.self_addr.clone(),
        PoolOptions {
            base_path: config.base_path.clone(),
            replicas: config.replicas,
            hash_fn: None,
        },
    ));
    pool.set(config.peer_addrs.iter().cloned());
    group.register_peers(pool.clone());

    let api_handle = if config.api_enabled {
        Some(spawn_api_server(&config, Arc::clone(&registry)).await?)
    } else {
        None
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], config.cache_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding peer server to {}", addr))?;
    info!("peercache is running at {}", config.self_addr);

    axum::serve(listener, peer_router(pool, registry))
        .with_graceful_shutdown(shutdown_signal(api_handle))
        .await
        .context("peer server failed")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Group `scores` over a static map standing in for a slow database.
fn create_group(config: &Config) -> Group {
    let db: HashMap<&'static str, &'static str> =
        HashMap::from([("Tom", "630"), ("Bob", "621"), ("Sam", "578")]);

    Group::new(
        config.group_name.clone(),
        config.cache_bytes,
        LoaderFn(move |key: &str| {
            debug!(key, "[SlowDB] search key");
            db.get(key)
                .map(|value| value.as_bytes().to_vec())
                .ok_or_else(|| CacheError::KeyNotFound(format!("{} not exist", key)))
        }),
    )
}

async fn spawn_api_server(
    config: &Config,
    registry: Arc<GroupRegistry>,
) -> anyhow::Result<JoinHandle<()>> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.api_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding front-end server to {}", addr))?;
    let app = create_router(AppState::new(registry, config.group_name.clone()));
    info!("Frontend server is running at http://{}", addr);

    Ok(tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, app).await {
            warn!(error = %err, "Frontend server stopped");
        }
    }))
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// On shutdown signal, aborts the front-end server and lets the peer server
/// drain.
async fn shutdown_signal(api_handle: Option<JoinHandle<()>>) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(error = %err, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    if let Some(handle) = api_handle {
        handle.abort();
        warn!("Frontend server aborted");
    }
}
