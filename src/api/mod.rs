//! API Module
//!
//! Optional front-end HTTP endpoint exposing the cache to external clients.
//!
//! # Endpoints
//! - `GET /api?key=<key>[&group=<group>]` - Read a key through the cache
//! - `GET /stats` - Group and cache statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
