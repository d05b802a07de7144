//! API Module
//!
//! The response cache middleware and the demo server mounted on it.
//!
//! # Endpoints
//! - `GET /api/collection/:id` - Cached JSON collection
//! - `GET /api/items/:id` - Cached item, 404s never cached
//! - `POST /api/clear/:group` - Expire a cache group
//! - `GET /stats` - Get cache statistics
//! - `GET /health` - Health check endpoint

pub mod controller;
pub mod handlers;
pub mod routes;

pub use controller::{cache_failure, cache_middleware, CacheController};
pub use handlers::*;
pub use routes::{create_router, COLLECTION_GROUP, ITEMS_GROUP};
