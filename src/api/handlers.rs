//! API Handlers
//!
//! Demo endpoints served behind the response cache, plus the
//! uncached operational endpoints.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use tracing::info;

use crate::backend::StorageBackend;
use crate::cache::{BoundedMemoryStore, CacheStats, MemoryStoreOptions};
use crate::config::{BackendKind, Config};
use crate::error::Result;
use crate::models::{ClearResponse, ErrorResponse, HealthResponse, ItemResponse, StatsResponse};
use crate::policy::{Clock, SystemClock};
use crate::remote::NetworkedStore;

/// Application state shared across all handlers and cache layers.
#[derive(Clone)]
pub struct AppState {
    /// Backend every cached route stores into
    pub store: Arc<dyn StorageBackend>,
    /// Set when `store` is the memory backend, for stats and cleanup
    pub memory: Option<BoundedMemoryStore>,
    pub clock: Arc<dyn Clock>,
    /// Cache duration applied to the demo routes
    pub duration: String,
    pub enabled: bool,
}

impl AppState {
    /// State over a memory store, with defaults for everything else.
    pub fn with_memory(store: BoundedMemoryStore) -> Self {
        let config = Config::default();
        Self {
            store: Arc::new(store.clone()),
            memory: Some(store),
            clock: Arc::new(SystemClock),
            duration: config.duration,
            enabled: config.enabled,
        }
    }

    /// State over any backend. Stats report zeros for it.
    pub fn with_backend(store: Arc<dyn StorageBackend>) -> Self {
        let config = Config::default();
        Self {
            store,
            memory: None,
            clock: Arc::new(SystemClock),
            duration: config.duration,
            enabled: config.enabled,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_duration(mut self, duration: impl Into<String>) -> Self {
        self.duration = duration.into();
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Creates a new AppState from configuration.
    ///
    /// Connects to Redis when the redis backend is selected.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let state = match config.backend {
            BackendKind::Memory => {
                let store =
                    BoundedMemoryStore::new(MemoryStoreOptions::with_max_size(config.max_size));
                Self::with_memory(store)
            }
            BackendKind::Redis => {
                let store = NetworkedStore::connect(&config.remote_options()).await?;
                info!(url = %config.redis_url, "connected to redis");
                Self::with_backend(Arc::new(store))
            }
        };

        Ok(state
            .with_duration(config.duration.clone())
            .with_enabled(config.enabled))
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.name()
    }
}

/// Handler for GET /api/collection/:id
pub async fn collection_handler(Path(id): Path<String>) -> Json<Value> {
    Json(json!({ "id": id, "foo": "bar" }))
}

/// Handler for GET /api/items/:id
///
/// Non-numeric ids are answered with 404, which the items route never caches.
pub async fn item_handler(
    Path(id): Path<String>,
) -> std::result::Result<Json<ItemResponse>, (StatusCode, Json<ErrorResponse>)> {
    match id.parse::<u64>() {
        Ok(id) => Ok(Json(ItemResponse::new(id))),
        Err(_) => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new(format!("Item '{}' not found", id))),
        )),
    }
}

/// Handler for POST /api/clear/:group
///
/// The cache layer in front of this route has already expired the group
/// by the time the handler runs.
pub async fn clear_handler(Path(group): Path<String>) -> Json<ClearResponse> {
    info!(group = %group, "cache group cleared");
    Json(ClearResponse::new(group))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let stats = match &state.memory {
        Some(memory) => memory.stats().await,
        None => CacheStats::default(),
    };

    Json(StatsResponse::new(state.backend_name(), &stats))
}

/// Handler for GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::healthy(state.backend_name()))
}
