//! Cache Options Module
//!
//! Per-route configuration of the response cache.

use std::fmt;
use std::sync::Arc;

use crate::policy::{RequestInfo, ResponseInfo, StatusCodeFilter};

/// Produces a discriminator appended to the logical key.
pub type AppendKeyFn = Arc<dyn Fn(&RequestInfo) -> String + Send + Sync>;
/// Decides whether a produced response is cached, overriding status filters.
pub type ToggleFn = Arc<dyn Fn(&RequestInfo, &ResponseInfo) -> bool + Send + Sync>;
/// Produces the group prefix for a request.
pub type GroupSelectorFn = Arc<dyn Fn(&RequestInfo) -> String + Send + Sync>;
/// Produces the groups a request invalidates.
pub type ExpireGroupsFn = Arc<dyn Fn(&RequestInfo) -> Vec<String> + Send + Sync>;

// == Cache Options ==
/// Builder-style options for a [`CachePolicy`](crate::policy::CachePolicy).
///
/// ```ignore
/// let options = CacheOptions::new()
///     .status_codes(StatusCodeFilter::exclude([500]))
///     .group("books")
///     .append_key(|req| req.method.to_string());
/// ```
#[derive(Clone)]
pub struct CacheOptions {
    pub enabled: bool,
    pub status_codes: StatusCodeFilter,
    pub default_duration_secs: Option<u64>,
    pub(crate) append_key: Option<AppendKeyFn>,
    pub(crate) toggle: Option<ToggleFn>,
    pub(crate) group_selector: Option<GroupSelectorFn>,
    pub(crate) expire_groups_selector: Option<ExpireGroupsFn>,
}

impl CacheOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn status_codes(mut self, filter: StatusCodeFilter) -> Self {
        self.status_codes = filter;
        self
    }

    /// TTL in seconds used when the policy is built without a duration string.
    pub fn default_duration_secs(mut self, secs: u64) -> Self {
        self.default_duration_secs = Some(secs);
        self
    }

    pub fn append_key(mut self, f: impl Fn(&RequestInfo) -> String + Send + Sync + 'static) -> Self {
        self.append_key = Some(Arc::new(f));
        self
    }

    pub fn toggle(
        mut self,
        f: impl Fn(&RequestInfo, &ResponseInfo) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.toggle = Some(Arc::new(f));
        self
    }

    pub fn group_selector(mut self, f: impl Fn(&RequestInfo) -> String + Send + Sync + 'static) -> Self {
        self.group_selector = Some(Arc::new(f));
        self
    }

    /// Places every response of this route in the fixed group `name`.
    pub fn group(self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.group_selector(move |_| name.clone())
    }

    pub fn expire_groups_selector(
        mut self,
        f: impl Fn(&RequestInfo) -> Vec<String> + Send + Sync + 'static,
    ) -> Self {
        self.expire_groups_selector = Some(Arc::new(f));
        self
    }

    /// Makes every request of this route expire the fixed `groups`.
    pub fn expire_groups<I, S>(self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let groups: Vec<String> = groups.into_iter().map(Into::into).collect();
        self.expire_groups_selector(move |_| groups.clone())
    }
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            status_codes: StatusCodeFilter::default(),
            default_duration_secs: None,
            append_key: None,
            toggle: None,
            group_selector: None,
            expire_groups_selector: None,
        }
    }
}

impl fmt::Debug for CacheOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheOptions")
            .field("enabled", &self.enabled)
            .field("status_codes", &self.status_codes)
            .field("default_duration_secs", &self.default_duration_secs)
            .field("append_key", &self.append_key.is_some())
            .field("toggle", &self.toggle.is_some())
            .field("group_selector", &self.group_selector.is_some())
            .field("expire_groups_selector", &self.expire_groups_selector.is_some())
            .finish()
    }
}
