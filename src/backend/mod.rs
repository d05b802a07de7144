//! Storage Backend Module
//!
//! The uniform contract every cache store implements, plus the key
//! namespacing shared by all of them.

mod namespace;


use async_trait::async_trait;

use crate::error::Result;

pub use namespace::{namespaced_key, KeyNamespace};

// == Public Constants ==
/// TTL in seconds applied when a write does not carry one
pub const DEFAULT_TTL_SECS: u64 = 3600;

// == Set Options ==
/// Per-write options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetOptions {
    /// TTL in seconds. `None` or `Some(0)` falls back to [`DEFAULT_TTL_SECS`].
    pub ttl: Option<u64>,
}

impl SetOptions {
    pub fn with_ttl(ttl: u64) -> Self {
        Self { ttl: Some(ttl) }
    }

    /// Returns the TTL a backend should apply.
    pub fn effective_ttl(&self) -> u64 {
        match self.ttl {
            Some(ttl) if ttl > 0 => ttl,
            _ => DEFAULT_TTL_SECS,
        }
    }
}

// == Storage Backend ==
/// Contract shared by the in-process and networked stores.
///
/// Every keyed operation takes the [`KeyNamespace`] resolved for the current
/// request, so no prefix state lives on the store itself.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Stores `value` under the namespaced `key`, replacing any prior entry
    /// and resetting its TTL.
    async fn set(&self, ns: &KeyNamespace, key: &str, value: &str, options: SetOptions)
        -> Result<()>;

    /// Returns the stored text, or `None` when missing or expired.
    async fn get(&self, ns: &KeyNamespace, key: &str) -> Result<Option<String>>;

    /// Removes the namespaced `key`. Returns whether it existed.
    async fn delete(&self, ns: &KeyNamespace, key: &str) -> Result<bool>;

    /// Deletes every key starting with the effective group.
    ///
    /// The effective group is `group` when given, otherwise the namespace
    /// prefix. With neither, nothing happens.
    async fn expire_group(&self, ns: &KeyNamespace, group: Option<&str>) -> Result<()>;

    /// Empties the store.
    async fn flush(&self) -> Result<()>;

    /// Releases underlying resources.
    async fn close(&self) -> Result<()>;

    /// Short backend name for logs.
    fn name(&self) -> &'static str;
}
