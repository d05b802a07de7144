//! Cache Controller
//!
//! Axum middleware running the per-request cache lifecycle:
//! group expiry, lookup, pass-through and capture.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use futures::future::try_join_all;
use tracing::{debug, error, warn};

use crate::backend::{KeyNamespace, SetOptions, StorageBackend};
use crate::error::{CacheError, Result};
use crate::policy::{
    cache_control, CachePolicy, CachedRecord, Clock, RequestInfo, ResponseInfo, SystemClock,
};

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

// == Cache Controller ==
/// Applies one [`CachePolicy`] over a shared [`StorageBackend`].
///
/// Cheap to clone; clones share the store, policy and clock.
#[derive(Clone)]
pub struct CacheController {
    store: Arc<dyn StorageBackend>,
    policy: Arc<CachePolicy>,
    clock: Arc<dyn Clock>,
}

impl CacheController {
    pub fn new(store: Arc<dyn StorageBackend>, policy: CachePolicy) -> Self {
        Self {
            store,
            policy: Arc::new(policy),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    pub fn store(&self) -> &Arc<dyn StorageBackend> {
        &self.store
    }

    /// Runs `request` through the cache, invoking `next` on a miss.
    ///
    /// Backend failures never fail the request: the error is logged, the
    /// request proceeds uncached and the [`CacheError`] is attached to the
    /// response extensions. A failed group expiry fails that request only.
    pub async fn handle(&self, request: Request, next: Next) -> Response {
        if !self.policy.enabled() {
            return next.run(request).await;
        }

        let info = RequestInfo::from_request(&request);
        let ns = self.policy.namespace(&info);

        if let Some(groups) = self.policy.groups_to_expire(&info) {
            return match self.expire_groups(&ns, &groups).await {
                Ok(()) => next.run(request).await,
                Err(err) => {
                    error!(error = %err, "group expiry failed");
                    err.into_response()
                }
            };
        }

        let key = self.policy.logical_key(&info);
        match self.store.get(&ns, &key).await {
            Ok(Some(payload)) => {
                debug!(key = %key, group = ns.prefix(), "cache hit");
                return self.serve_hit(payload);
            }
            Ok(None) => debug!(key = %key, group = ns.prefix(), "cache miss"),
            Err(err) => {
                error!(key = %key, error = %err, backend = self.store.name(), "cache lookup failed, passing through");
                let mut response = next.run(request).await;
                response.extensions_mut().insert(err);
                return response;
            }
        }

        let response = next.run(request).await;
        self.capture(&info, &ns, &key, response).await
    }

    async fn expire_groups(&self, ns: &KeyNamespace, groups: &[String]) -> Result<()> {
        try_join_all(
            groups
                .iter()
                .map(|group| self.store.expire_group(ns, Some(group.as_str()))),
        )
        .await?;
        debug!(?groups, "expired cache groups");
        Ok(())
    }

    // == Hit ==
    fn serve_hit(&self, payload: String) -> Response {
        let (body, content_type, max_age) = match CachedRecord::parse(&payload) {
            Some(record) => {
                let max_age = self
                    .policy
                    .remaining_freshness(record.captured_at(), self.clock.now());
                let content_type = HeaderValue::from_str(record.content_type())
                    .unwrap_or_else(|_| HeaderValue::from_static(TEXT_PLAIN));
                (record.body(), content_type, max_age)
            }
            None => {
                warn!("stored value is not a cached record, serving it raw");
                (
                    payload.into_bytes(),
                    HeaderValue::from_static(TEXT_PLAIN),
                    self.policy.ttl_secs(),
                )
            }
        };

        let mut response = Response::new(Body::from(body));
        let headers = response.headers_mut();
        headers.insert(header::CONTENT_TYPE, content_type);
        headers.insert(header::CACHE_CONTROL, cache_control(max_age));
        response
    }

    // == Capture ==
    async fn capture(
        &self,
        info: &RequestInfo,
        ns: &KeyNamespace,
        key: &str,
        response: Response,
    ) -> Response {
        let verdict = ResponseInfo {
            status: response.status(),
        };
        if !self.policy.should_cache(info, &verdict) {
            debug!(key, status = %verdict.status, "response not eligible for caching");
            return response;
        }

        let (mut parts, body) = response.into_parts();
        let bytes = match axum::body::to_bytes(body, usize::MAX).await {
            Ok(bytes) => bytes,
            Err(err) => {
                error!(key, error = %err, "failed to read response body");
                return CacheError::Internal(format!("failed to read response body: {err}"))
                    .into_response();
            }
        };

        let ttl = self.policy.ttl_secs();
        parts.headers.insert(header::CACHE_CONTROL, cache_control(ttl));

        let content_type = parts
            .headers
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok());
        let record = CachedRecord::capture(&bytes, content_type, self.clock.now());
        match self
            .store
            .set(ns, key, &record.to_json(), SetOptions::with_ttl(ttl))
            .await
        {
            Ok(()) => debug!(key, ttl, "captured response"),
            Err(err) => {
                warn!(key, error = %err, backend = self.store.name(), "failed to store response");
                parts.extensions.insert(err);
            }
        }

        Response::from_parts(parts, Body::from(bytes))
    }
}

/// Middleware entry point for `axum::middleware::from_fn_with_state`.
pub async fn cache_middleware(
    State(controller): State<CacheController>,
    request: Request,
    next: Next,
) -> Response {
    controller.handle(request, next).await
}

/// The backend error a failed lookup or write attached to `response`, if any.
pub fn cache_failure(response: &Response) -> Option<&CacheError> {
    response.extensions().get::<CacheError>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::BoundedMemoryStore;
    use crate::policy::{CacheOptions, MockClock, StatusCodeFilter};
    use crate::remote::{InMemoryRemote, NetworkedStore};
    use axum::{http::StatusCode, middleware::from_fn_with_state, routing::get, Router};
    use chrono::Duration;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    struct Fixture {
        app: Router,
        calls: Arc<AtomicUsize>,
        clock: Arc<MockClock>,
    }

    fn fixture(store: Arc<dyn StorageBackend>, duration: &str, options: CacheOptions) -> Fixture {
        let calls = Arc::new(AtomicUsize::new(0));
        let clock = Arc::new(MockClock::starting_now());
        let controller = CacheController::new(store, CachePolicy::new(Some(duration), options))
            .with_clock(clock.clone());

        let counter = calls.clone();
        let app = Router::new()
            .route(
                "/api/collection/:id",
                get(move || {
                    let counter = counter.clone();
                    async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                        axum::Json(serde_json::json!({ "foo": "bar" }))
                    }
                }),
            )
            .route(
                "/api/status/:code",
                get(|axum::extract::Path(code): axum::extract::Path<u16>| async move {
                    (StatusCode::from_u16(code).unwrap(), "status body")
                }),
            )
            .layer(from_fn_with_state(controller, cache_middleware));

        Fixture { app, calls, clock }
    }

    async fn send(app: &Router, uri: &str) -> Response {
        app.clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn max_age(response: &Response) -> Option<&str> {
        response
            .headers()
            .get(header::CACHE_CONTROL)
            .and_then(|v| v.to_str().ok())
    }

    #[tokio::test]
    async fn test_miss_then_hit_with_decremented_max_age() {
        let f = fixture(Arc::new(BoundedMemoryStore::unbounded()), "10 seconds", CacheOptions::new());

        let first = send(&f.app, "/api/collection/1").await;
        assert_eq!(first.status(), StatusCode::OK);
        assert_eq!(max_age(&first), Some("max-age=10"));
        assert_eq!(body_string(first).await, r#"{"foo":"bar"}"#);

        f.clock.advance(Duration::seconds(1));

        let second = send(&f.app, "/api/collection/1").await;
        assert_eq!(second.status(), StatusCode::OK);
        assert_eq!(max_age(&second), Some("max-age=9"));
        assert_eq!(
            second.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
        assert_eq!(body_string(second).await, r#"{"foo":"bar"}"#);
        assert_eq!(f.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_disabled_skips_lookup_and_capture() {
        let store = Arc::new(BoundedMemoryStore::unbounded());
        let f = fixture(store.clone(), "10 seconds", CacheOptions::new().enabled(false));

        let response = send(&f.app, "/api/collection/1").await;
        send(&f.app, "/api/collection/1").await;

        assert!(max_age(&response).is_none());
        assert!(store.is_empty().await);
        assert_eq!(f.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_excluded_status_passes_through_uncached() {
        let store = Arc::new(BoundedMemoryStore::unbounded());
        let f = fixture(
            store.clone(),
            "10 seconds",
            CacheOptions::new().status_codes(StatusCodeFilter::exclude([201])),
        );

        let response = send(&f.app, "/api/status/201").await;

        assert_eq!(response.status(), StatusCode::CREATED);
        assert!(max_age(&response).is_none());
        assert_eq!(body_string(response).await, "status body");
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_text_body_is_served_as_text() {
        let f = fixture(Arc::new(BoundedMemoryStore::unbounded()), "1 minute", CacheOptions::new());

        send(&f.app, "/api/status/200").await;
        let hit = send(&f.app, "/api/status/200").await;

        assert_eq!(
            hit.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/plain; charset=utf-8"
        );
        assert_eq!(body_string(hit).await, "status body");
    }

    #[tokio::test]
    async fn test_malformed_stored_value_served_raw() {
        let store = Arc::new(BoundedMemoryStore::unbounded());
        store
            .set(&KeyNamespace::none(), "/api/collection/9", "legacy text", SetOptions::default())
            .await
            .unwrap();
        let f = fixture(store, "10 seconds", CacheOptions::new());

        let response = send(&f.app, "/api/collection/9").await;

        assert_eq!(max_age(&response), Some("max-age=10"));
        assert_eq!(body_string(response).await, "legacy text");
        assert_eq!(f.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_backend_outage_passes_through() {
        let remote = Arc::new(InMemoryRemote::new());
        remote.set_unavailable(true);
        let store = Arc::new(NetworkedStore::from_shared(remote, 10));
        let f = fixture(store, "10 seconds", CacheOptions::new());

        let response = send(&f.app, "/api/collection/1").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert!(matches!(cache_failure(&response), Some(CacheError::Backend(_))));
        assert!(max_age(&response).is_none());
        assert_eq!(body_string(response).await, r#"{"foo":"bar"}"#);
        assert_eq!(f.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_expiry_fails_the_request() {
        let remote = Arc::new(InMemoryRemote::new());
        remote.set_failing_scans(true);
        let store = Arc::new(NetworkedStore::from_shared(remote, 10));
        let f = fixture(
            store,
            "10 seconds",
            CacheOptions::new().expire_groups(["collection"]),
        );

        let response = send(&f.app, "/api/collection/1").await;

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(f.calls.load(Ordering::SeqCst), 0);
    }

    fn replay_app(store: Arc<dyn StorageBackend>) -> Router {
        let controller = CacheController::new(store, CachePolicy::new(Some("1 minute"), CacheOptions::new()));
        Router::new()
            .route("/string", get(|| async { axum::Json("hello") }))
            .route("/html", get(|| async { axum::response::Html("<p>hi</p>") }))
            .layer(from_fn_with_state(controller, cache_middleware))
    }

    async fn body_and_type(response: Response) -> (String, String) {
        let content_type = response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .to_string();
        (body_string(response).await, content_type)
    }

    #[tokio::test]
    async fn test_json_string_body_replayed_identically() {
        let app = replay_app(Arc::new(BoundedMemoryStore::unbounded()));

        let miss = body_and_type(send(&app, "/string").await).await;
        let hit = send(&app, "/string").await;
        assert!(max_age(&hit).is_some());
        let hit = body_and_type(hit).await;

        assert_eq!(miss, (r#""hello""#.to_string(), "application/json".to_string()));
        assert_eq!(hit, miss);
    }

    #[tokio::test]
    async fn test_html_body_replayed_with_its_content_type() {
        let remote = Arc::new(InMemoryRemote::new());
        let app = replay_app(Arc::new(NetworkedStore::from_shared(remote, 10)));

        let miss = body_and_type(send(&app, "/html").await).await;
        let hit = body_and_type(send(&app, "/html").await).await;

        assert_eq!(
            miss,
            ("<p>hi</p>".to_string(), "text/html; charset=utf-8".to_string())
        );
        assert_eq!(hit, miss);
    }

    #[tokio::test]
    async fn test_failed_write_passes_response_through() {
        let remote = Arc::new(InMemoryRemote::new());
        remote.set_failing_writes(true);
        let store = Arc::new(NetworkedStore::from_shared(remote.clone(), 10));
        let f = fixture(store, "10 seconds", CacheOptions::new());

        let first = send(&f.app, "/api/collection/1").await;

        assert_eq!(first.status(), StatusCode::OK);
        assert!(matches!(cache_failure(&first), Some(CacheError::Backend(_))));
        assert_eq!(body_string(first).await, r#"{"foo":"bar"}"#);
        assert!(remote.keys().is_empty());

        // Nothing was stored, so the handler runs again
        let second = send(&f.app, "/api/collection/1").await;
        assert!(cache_failure(&second).is_some());
        assert_eq!(f.calls.load(Ordering::SeqCst), 2);
    }
}
