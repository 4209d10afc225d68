//! # API Shared
//!
//! Shared definitions for the GrokDoc HTTP API.
//!
//! Contains:
//! - Request/response bodies with OpenAPI schemas (`dto` module)
//! - Shared services like `HealthService`
//!
//! Used by `api-rest` and by clients that want typed bodies.

pub mod dto;
pub mod health;

pub use dto::*;
pub use health::HealthService;
