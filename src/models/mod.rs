//! Request and Response models for the front-end API
//!
//! This module defines the DTOs (Data Transfer Objects) used for
//! deserializing query strings and serializing JSON response bodies.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::ApiQuery;
pub use responses::{GroupStatsResponse, HealthResponse, StatsResponse};
