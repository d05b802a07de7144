//! Remote Module
//!
//! Storage backend over a networked key/value service (Redis), with batched
//! reads and cursor-scan group expiry.

mod client;
mod loader;
mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::backend::{KeyNamespace, SetOptions, StorageBackend};
use crate::error::{CacheError, Result};

pub use client::{RedisClient, RemoteClient};
pub use loader::BatchLoader;
pub use memory::{glob_match, InMemoryRemote};

/// Keys requested per SCAN step
pub const DEFAULT_SCAN_COUNT: usize = 100;

// == Remote Options ==
/// Connection parameters for [`NetworkedStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteOptions {
    pub url: String,
    pub scan_count: usize,
}

impl Default for RemoteOptions {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            scan_count: DEFAULT_SCAN_COUNT,
        }
    }
}

/// Escapes glob metacharacters so `group` matches literally in a SCAN pattern.
pub fn escape_glob(group: &str) -> String {
    let mut escaped = String::with_capacity(group.len());
    for c in group.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

// == Networked Store ==
/// [`StorageBackend`] delegating to a [`RemoteClient`]. The remote service
/// owns TTL expiry and serializes concurrent writers.
pub struct NetworkedStore<C = RedisClient> {
    client: Arc<C>,
    loader: BatchLoader<C>,
    scan_count: usize,
}

impl NetworkedStore<RedisClient> {
    /// Connects to Redis with `options`.
    pub async fn connect(options: &RemoteOptions) -> Result<Self> {
        let client = RedisClient::connect(&options.url).await?;
        Ok(Self::with_client(client, options.scan_count))
    }
}

impl<C: RemoteClient> NetworkedStore<C> {
    pub fn with_client(client: C, scan_count: usize) -> Self {
        Self::from_shared(Arc::new(client), scan_count)
    }

    /// Builds a store over a client the caller keeps a handle to.
    pub fn from_shared(client: Arc<C>, scan_count: usize) -> Self {
        Self {
            loader: BatchLoader::new(Arc::clone(&client)),
            client,
            scan_count: scan_count.max(1),
        }
    }

    async fn scan_and_delete(&self, group: &str) -> Result<u64> {
        let pattern = format!("{}*", escape_glob(group));
        let mut cursor = 0;
        let mut removed = 0;

        loop {
            let (next, keys) = self.client.scan(cursor, &pattern, self.scan_count).await?;
            if !keys.is_empty() {
                removed += self.client.del(&keys).await?;
            }
            if next == 0 {
                return Ok(removed);
            }
            cursor = next;
        }
    }
}

#[async_trait]
impl<C: RemoteClient> StorageBackend for NetworkedStore<C> {
    async fn set(&self, ns: &KeyNamespace, key: &str, value: &str, options: SetOptions) -> Result<()> {
        if key.is_empty() {
            return Err(CacheError::InvalidRequest("Key cannot be empty".to_string()));
        }
        self.client
            .set_ex(&ns.key(key), value, options.effective_ttl())
            .await
    }

    async fn get(&self, ns: &KeyNamespace, key: &str) -> Result<Option<String>> {
        self.loader.load(&ns.key(key)).await
    }

    async fn delete(&self, ns: &KeyNamespace, key: &str) -> Result<bool> {
        let removed = self.client.del(&[ns.key(key)]).await?;
        Ok(removed > 0)
    }

    async fn expire_group(&self, ns: &KeyNamespace, group: Option<&str>) -> Result<()> {
        let Some(group) = ns.resolve_group(group) else {
            return Ok(());
        };

        let removed = self
            .scan_and_delete(group)
            .await
            .map_err(|err| CacheError::group_expiry(group, err))?;
        debug!(group, removed, "expired networked cache group");
        Ok(())
    }

    async fn flush(&self) -> Result<()> {
        self.client.flush_all().await
    }

    async fn close(&self) -> Result<()> {
        self.client.quit().await?;
        info!("networked store closed");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}

impl<C> std::fmt::Debug for NetworkedStore<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkedStore")
            .field("scan_count", &self.scan_count)
            .finish_non_exhaustive()
    }
}
