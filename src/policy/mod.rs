//! Cache Policy Module
//!
//! Decides, per request and response, what is cached, under which key and
//! for how long, and what freshness a hit advertises.

mod clock;
mod duration;
mod options;
mod record;
mod request;
mod status;

use axum::http::HeaderValue;
use chrono::{DateTime, Utc};

use crate::backend::KeyNamespace;

pub use clock::{Clock, MockClock, SystemClock};
pub use duration::{parse_duration, DEFAULT_DURATION_SECS};
pub use options::{AppendKeyFn, CacheOptions, ExpireGroupsFn, GroupSelectorFn, ToggleFn};
pub use record::CachedRecord;
pub use request::{RequestInfo, ResponseInfo};
pub use status::StatusCodeFilter;

/// Separator placed between the request key and an appended discriminator
pub const APPEND_KEY_SEPARATOR: &str = "$$appendKey=";

// == Cache Policy ==
#[derive(Debug, Clone)]
pub struct CachePolicy {
    ttl_secs: u64,
    options: CacheOptions,
}

impl CachePolicy {
    /// Builds a policy caching for `duration` (see [`parse_duration`]).
    /// Without a duration the options' default, else one hour, applies.
    pub fn new(duration: Option<&str>, options: CacheOptions) -> Self {
        let ttl_secs = match duration {
            Some(duration) => parse_duration(duration),
            None => options.default_duration_secs.unwrap_or(DEFAULT_DURATION_SECS),
        };
        Self { ttl_secs, options }
    }

    pub fn enabled(&self) -> bool {
        self.options.enabled
    }

    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    pub fn options(&self) -> &CacheOptions {
        &self.options
    }

    // == Key Computation ==
    /// Path and query, plus the appended discriminator when configured.
    pub fn logical_key(&self, request: &RequestInfo) -> String {
        let mut key = request.path_and_query().to_string();
        if let Some(append_key) = &self.options.append_key {
            key.push_str(APPEND_KEY_SEPARATOR);
            key.push_str(&append_key(request));
        }
        key
    }

    // == Group Resolution ==
    /// Namespace in effect for `request`; empty without a group selector.
    pub fn namespace(&self, request: &RequestInfo) -> KeyNamespace {
        match &self.options.group_selector {
            Some(select) => KeyNamespace::new(select(request)),
            None => KeyNamespace::none(),
        }
    }

    /// Groups `request` invalidates, or `None` when it triggers no expiry.
    pub fn groups_to_expire(&self, request: &RequestInfo) -> Option<Vec<String>> {
        let select = self.options.expire_groups_selector.as_ref()?;
        let groups: Vec<String> = select(request)
            .into_iter()
            .filter(|group| !group.is_empty())
            .collect();
        (!groups.is_empty()).then_some(groups)
    }

    // == Eligibility ==
    /// Toggle first, then the status code filter, else always.
    pub fn should_cache(&self, request: &RequestInfo, response: &ResponseInfo) -> bool {
        if let Some(toggle) = &self.options.toggle {
            return toggle(request, response);
        }
        self.options.status_codes.allows(response.status.as_u16())
    }

    // == Freshness ==
    /// Seconds left before a record captured at `captured_at` goes stale.
    ///
    /// A record without a readable capture time is treated as just captured.
    pub fn remaining_freshness(&self, captured_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> u64 {
        let Some(captured_at) = captured_at else {
            return self.ttl_secs;
        };
        let elapsed_secs = (now - captured_at).num_milliseconds().max(0) as f64 / 1000.0;
        let remaining = self.ttl_secs as f64 - elapsed_secs;
        if remaining <= 0.0 {
            0
        } else {
            remaining.floor() as u64
        }
    }
}

/// `max-age=<secs>` header value.
pub fn cache_control(max_age: u64) -> HeaderValue {
    // Digits and ASCII letters only, always a valid header value
    HeaderValue::from_str(&format!("max-age={max_age}"))
        .unwrap_or_else(|_| HeaderValue::from_static("no-cache"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{Method, StatusCode};
    use chrono::{Duration, TimeZone};

    fn request(uri: &str) -> RequestInfo {
        RequestInfo::new(Method::GET, uri.parse().unwrap())
    }

    fn response(status: u16) -> ResponseInfo {
        ResponseInfo {
            status: StatusCode::from_u16(status).unwrap(),
        }
    }

    #[test]
    fn test_ttl_from_duration_or_default() {
        assert_eq!(CachePolicy::new(Some("10 seconds"), CacheOptions::new()).ttl_secs(), 10);
        assert_eq!(CachePolicy::new(None, CacheOptions::new()).ttl_secs(), 3600);
        assert_eq!(
            CachePolicy::new(None, CacheOptions::new().default_duration_secs(42)).ttl_secs(),
            42
        );
    }

    #[test]
    fn test_logical_key_with_append_key() {
        let policy = CachePolicy::new(
            Some("10 seconds"),
            CacheOptions::new().append_key(|req| format!("{}myKey", req.method)),
        );

        assert_eq!(
            policy.logical_key(&request("/api/collection/1?x=2")),
            "/api/collection/1?x=2$$appendKey=GETmyKey"
        );
    }

    #[test]
    fn test_logical_key_is_path_and_query() {
        let policy = CachePolicy::new(None, CacheOptions::new());
        assert_eq!(policy.logical_key(&request("/a/b?c=d")), "/a/b?c=d");
    }

    #[test]
    fn test_namespace_from_selector() {
        let policy = CachePolicy::new(
            None,
            CacheOptions::new().group_selector(|req| {
                req.uri.path().split('/').nth(2).unwrap_or_default().to_string()
            }),
        );

        assert_eq!(policy.namespace(&request("/api/books/1")), KeyNamespace::new("books"));
        assert_eq!(
            CachePolicy::new(None, CacheOptions::new()).namespace(&request("/api/books/1")),
            KeyNamespace::none()
        );
    }

    #[test]
    fn test_groups_to_expire() {
        let policy = CachePolicy::new(None, CacheOptions::new().expire_groups(["books", ""]));
        assert_eq!(
            policy.groups_to_expire(&request("/api/clear")),
            Some(vec!["books".to_string()])
        );

        let empty = CachePolicy::new(None, CacheOptions::new().expire_groups(Vec::<String>::new()));
        assert_eq!(empty.groups_to_expire(&request("/api/clear")), None);

        let none = CachePolicy::new(None, CacheOptions::new());
        assert_eq!(none.groups_to_expire(&request("/api/clear")), None);
    }

    #[test]
    fn test_should_cache_order() {
        let req = request("/a");

        let always = CachePolicy::new(None, CacheOptions::new());
        assert!(always.should_cache(&req, &response(500)));

        let include = CachePolicy::new(
            None,
            CacheOptions::new().status_codes(StatusCodeFilter::include([400])),
        );
        assert!(include.should_cache(&req, &response(400)));
        assert!(!include.should_cache(&req, &response(404)));

        let exclude = CachePolicy::new(
            None,
            CacheOptions::new().status_codes(StatusCodeFilter::exclude([201])),
        );
        assert!(!exclude.should_cache(&req, &response(201)));
        assert!(exclude.should_cache(&req, &response(200)));

        // The toggle overrides the status filter
        let toggled = CachePolicy::new(
            None,
            CacheOptions::new()
                .status_codes(StatusCodeFilter::include([400]))
                .toggle(|req, _| req.method == Method::GET),
        );
        assert!(toggled.should_cache(&req, &response(200)));
        let post = RequestInfo::new(Method::POST, "/a".parse().unwrap());
        assert!(!toggled.should_cache(&post, &response(400)));
    }

    #[test]
    fn test_remaining_freshness_decrements_and_floors() {
        let policy = CachePolicy::new(Some("10 seconds"), CacheOptions::new());
        let captured = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();

        assert_eq!(policy.remaining_freshness(Some(captured), captured), 10);
        assert_eq!(
            policy.remaining_freshness(Some(captured), captured + Duration::seconds(1)),
            9
        );
        assert_eq!(
            policy.remaining_freshness(Some(captured), captured + Duration::milliseconds(1500)),
            8
        );
        assert_eq!(
            policy.remaining_freshness(Some(captured), captured + Duration::seconds(30)),
            0
        );
        // A capture time ahead of now never advertises more than the TTL
        assert_eq!(
            policy.remaining_freshness(Some(captured), captured - Duration::seconds(5)),
            10
        );
        assert_eq!(policy.remaining_freshness(None, captured), 10);
    }

    #[test]
    fn test_cache_control_header() {
        assert_eq!(cache_control(10), HeaderValue::from_static("max-age=10"));
    }
}
