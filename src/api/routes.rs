//! API Routes
//!
//! Configures the Axum router for the demo server, each cached route
//! behind its own [`CacheController`].

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::controller::{cache_middleware, CacheController};
use super::handlers::{
    clear_handler, collection_handler, health_handler, item_handler, stats_handler, AppState,
};
use crate::policy::{CacheOptions, CachePolicy, RequestInfo, StatusCodeFilter};

/// Group holding the `/api/collection` responses
pub const COLLECTION_GROUP: &str = "collection";
/// Group holding the `/api/items` responses
pub const ITEMS_GROUP: &str = "items";

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /api/collection/:id` - Cached in the `collection` group
/// - `GET /api/items/:id` - Cached in the `items` group, 404s excluded
/// - `POST /api/clear/:group` - Expires the named group
/// - `GET /stats` - Cache statistics
/// - `GET /health` - Health check endpoint
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let collection = controller(&state, CacheOptions::new().group(COLLECTION_GROUP));
    let items = controller(
        &state,
        CacheOptions::new()
            .group(ITEMS_GROUP)
            .status_codes(StatusCodeFilter::exclude([404])),
    );
    let clear = controller(
        &state,
        CacheOptions::new().expire_groups_selector(|req| vec![last_segment(req)]),
    );

    Router::new()
        .route(
            "/api/collection/:id",
            get(collection_handler).layer(from_fn_with_state(collection, cache_middleware)),
        )
        .route(
            "/api/items/:id",
            get(item_handler).layer(from_fn_with_state(items, cache_middleware)),
        )
        .route(
            "/api/clear/:group",
            post(clear_handler).layer(from_fn_with_state(clear, cache_middleware)),
        )
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn controller(state: &AppState, options: CacheOptions) -> CacheController {
    let policy = CachePolicy::new(Some(state.duration.as_str()), options.enabled(state.enabled));
    CacheController::new(state.store.clone(), policy).with_clock(state.clock.clone())
}

fn last_segment(request: &RequestInfo) -> String {
    request
        .uri
        .path()
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::BoundedMemoryStore;
    use axum::{
        body::Body,
        http::{Method, Request, StatusCode},
    };
    use tower::util::ServiceExt;

    fn create_test_app() -> Router {
        create_router(AppState::with_memory(BoundedMemoryStore::unbounded()))
    }

    #[test]
    fn test_last_segment() {
        let req = RequestInfo::new(Method::POST, "/api/clear/items".parse().unwrap());
        assert_eq!(last_segment(&req), "items");
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get("cache-control").is_none());
    }

    #[tokio::test]
    async fn test_collection_endpoint_is_cached() {
        let app = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/collection/1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["cache-control"], "max-age=3600");
    }

    #[tokio::test]
    async fn test_item_not_found() {
        let app = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/items/nonexistent")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.headers().get("cache-control").is_none());
    }

    #[tokio::test]
    async fn test_clear_endpoint() {
        let app = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/clear/collection")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
