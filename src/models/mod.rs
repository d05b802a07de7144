//! Response models for the demo server API
//!
//! DTOs serialized by the handlers in [`crate::api::handlers`].

pub mod responses;

pub use responses::{ClearResponse, ErrorResponse, HealthResponse, ItemResponse, StatsResponse};
