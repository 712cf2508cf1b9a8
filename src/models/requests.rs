//! Request DTOs for the front-end API
//!
//! Defines the query parameters accepted by `GET /api`.

use serde::Deserialize;

/// Query string of `GET /api?key=<key>[&group=<group>]`
///
/// # Fields
/// - `key`: The key to read
/// - `group`: Group to read from (the server's default group if omitted)
#[derive(Debug, Clone, Deserialize)]
pub struct ApiQuery {
    /// The key to read, empty if missing
    #[serde(default)]
    pub key: String,
    /// Optional group name
    #[serde(default)]
    pub group: Option<String>,
}
