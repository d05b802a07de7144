//! API Cache - response caching middleware for axum
//!
//! Captures handler responses into a pluggable storage backend (a
//! size-bounded in-process LRU or Redis) and replays them with a
//! decreasing `Cache-Control: max-age`. Entries can be grouped and a
//! whole group expired by another route.

pub mod api;
pub mod backend;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod policy;
pub mod remote;
pub mod tasks;

pub use api::{cache_middleware, create_router, AppState, CacheController};
pub use backend::{KeyNamespace, SetOptions, StorageBackend};
pub use cache::{BoundedMemoryStore, MemoryStoreOptions};
pub use config::{BackendKind, Config};
pub use error::CacheError;
pub use policy::{CacheOptions, CachePolicy, StatusCodeFilter};
pub use remote::{NetworkedStore, RemoteOptions};
pub use tasks::spawn_cleanup_task;
