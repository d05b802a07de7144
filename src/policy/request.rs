//! Request and response descriptors handed to policy callbacks.

use axum::extract::{OriginalUri, Request};
use axum::http::{HeaderMap, Method, StatusCode, Uri};

// == Request Info ==
/// The parts of a request the cache policy looks at.
#[derive(Debug, Clone)]
pub struct RequestInfo {
    pub method: Method,
    /// URI as received by the server, before any router nesting stripped it
    pub uri: Uri,
    pub headers: HeaderMap,
}

impl RequestInfo {
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            method,
            uri,
            headers: HeaderMap::new(),
        }
    }

    pub fn from_request(request: &Request) -> Self {
        let uri = request
            .extensions()
            .get::<OriginalUri>()
            .map(|original| original.0.clone())
            .unwrap_or_else(|| request.uri().clone());

        Self {
            method: request.method().clone(),
            uri,
            headers: request.headers().clone(),
        }
    }

    /// Path plus query string, e.g. "/api/items/1?page=2".
    pub fn path_and_query(&self) -> &str {
        self.uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or_else(|| self.uri.path())
    }
}

// == Response Info ==
/// The parts of a produced response the cache policy looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseInfo {
    pub status: StatusCode,
}
