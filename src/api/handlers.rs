//! API Handlers
//!
//! HTTP request handlers for the front-end endpoints.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};

use crate::error::{CacheError, Result};
use crate::group::GroupRegistry;
use crate::models::{ApiQuery, GroupStatsResponse, HealthResponse, StatsResponse};
use crate::peers::protocol::CONTENT_TYPE;

/// Application state shared across all front-end handlers.
#[derive(Clone)]
pub struct AppState {
    /// Groups this process serves
    pub registry: Arc<GroupRegistry>,
    /// Group used when a request does not name one
    pub default_group: String,
}

impl AppState {
    /// Creates a new AppState over a registry.
    pub fn new(registry: Arc<GroupRegistry>, default_group: impl Into<String>) -> Self {
        Self {
            registry,
            default_group: default_group.into(),
        }
    }
}

/// Handler for GET /api?key=<key>[&group=<group>]
///
/// Reads a key through the group and returns the raw value bytes.
pub async fn api_handler(
    State(state): State<AppState>,
    Query(query): Query<ApiQuery>,
) -> Result<Response> {
    let name = query.group.unwrap_or(state.default_group);
    let group = state
        .registry
        .get(&name)
        .ok_or(CacheError::NoSuchGroup(name))?;

    let view = group.get(&query.key).await?;

    Ok(([(header::CONTENT_TYPE, CONTENT_TYPE)], view.to_vec()).into_response())
}

/// Handler for GET /stats
///
/// Returns read-path and cache statistics of every group.
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let groups = state
        .registry
        .groups()
        .map(|group| GroupStatsResponse::from_group(group))
        .collect();

    Json(StatsResponse::new(groups))
}

/// Handler for GET /health
///
/// Returns health status of the server.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
