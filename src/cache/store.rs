//! Cache Store Module
//!
//! The bounded in-process store: a HashMap of entries with LRU accounting,
//! TTL expiry and prefix-based group deletion, wrapped for shared async use.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::backend::{KeyNamespace, SetOptions, StorageBackend};
use crate::cache::{default_length, CacheEntry, CacheStats, LengthFn, LruLedger, StoredValue};
use crate::error::{CacheError, Result};

// == Memory Store Options ==
/// Construction options for [`BoundedMemoryStore`].
#[derive(Clone)]
pub struct MemoryStoreOptions {
    /// Maximum aggregate size as measured by `length`
    pub max_size: usize,
    /// Size of a single entry
    pub length: LengthFn,
}

impl MemoryStoreOptions {
    pub fn with_max_size(max_size: usize) -> Self {
        Self {
            max_size,
            ..Self::default()
        }
    }

    pub fn length(mut self, length: impl Fn(&StoredValue, &str) -> usize + Send + Sync + 'static) -> Self {
        self.length = Arc::new(length);
        self
    }
}

impl Default for MemoryStoreOptions {
    fn default() -> Self {
        Self {
            max_size: usize::MAX,
            length: Arc::new(default_length),
        }
    }
}

impl fmt::Debug for MemoryStoreOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStoreOptions")
            .field("max_size", &self.max_size)
            .finish_non_exhaustive()
    }
}

// == LRU Store ==
/// Recency and counters, updated by lookups through a shared reference.
#[derive(Debug, Default)]
struct Accounting {
    lru: LruLedger,
    stats: CacheStats,
}

/// Outcome of a [`LruStore::lookup`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Hit(String),
    /// Present but past its TTL; remove it with [`LruStore::remove_expired`]
    Expired,
    Missing,
}

/// Synchronous store engine.
///
/// Mutations take `&mut self`. Lookups take `&self` and only lock the
/// recency and counter bookkeeping, so concurrent readers of a shared
/// engine never wait on each other for the entries themselves.
pub struct LruStore {
    entries: HashMap<String, CacheEntry>,
    accounting: Mutex<Accounting>,
    max_size: usize,
    length: LengthFn,
}

impl LruStore {
    pub fn new(options: MemoryStoreOptions) -> Self {
        Self {
            entries: HashMap::new(),
            accounting: Mutex::new(Accounting::default()),
            max_size: options.max_size,
            length: options.length,
        }
    }

    fn accounting(&self) -> MutexGuard<'_, Accounting> {
        self.accounting
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn accounting_mut(&mut self) -> &mut Accounting {
        self.accounting
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // == Set ==
    /// Stores `value` under `key` for `ttl_secs`, evicting least recently
    /// used entries until the aggregate size fits.
    ///
    /// A value larger than the whole bound is not stored and any prior
    /// entry for `key` is dropped.
    pub fn set(&mut self, key: &str, value: &str, ttl_secs: u64) {
        let value = StoredValue::from_text(value);
        let size = (self.length)(&value, key);

        self.remove(key);

        if size > self.max_size {
            debug!(key, size, max_size = self.max_size, "value exceeds store bound, not stored");
            return;
        }

        let max_size = self.max_size;
        let mut evicted = Vec::new();
        {
            let accounting = self.accounting_mut();
            while accounting.lru.total_size() + size > max_size {
                match accounting.lru.evict_oldest() {
                    Some(oldest) => {
                        accounting.stats.record_eviction();
                        evicted.push(oldest);
                    }
                    None => break,
                }
            }
            accounting.lru.insert(key, size);
        }
        for oldest in evicted {
            self.entries.remove(&oldest);
            debug!(key = %oldest, "evicted least recently used entry");
        }

        self.entries
            .insert(key.to_string(), CacheEntry::new(value, size, ttl_secs));
    }

    // == Lookup ==
    /// Reads `key` without exclusive access, recording the hit or miss.
    pub fn lookup(&self, key: &str) -> Lookup {
        let found = match self.entries.get(key) {
            Some(entry) if entry.is_expired() => Lookup::Expired,
            Some(entry) => Lookup::Hit(entry.value.to_text()),
            None => Lookup::Missing,
        };

        let mut accounting = self.accounting();
        match &found {
            Lookup::Hit(_) => {
                accounting.lru.touch(key);
                accounting.stats.record_hit();
            }
            Lookup::Expired | Lookup::Missing => accounting.stats.record_miss(),
        }
        found
    }

    /// Removes `key` if it is still expired. Returns whether it was removed.
    pub fn remove_expired(&mut self, key: &str) -> bool {
        match self.entries.get(key) {
            Some(entry) if entry.is_expired() => self.remove(key),
            _ => false,
        }
    }

    // == Get ==
    /// [`lookup`](Self::lookup) that also drops an expired entry.
    pub fn get(&mut self, key: &str) -> Option<String> {
        match self.lookup(key) {
            Lookup::Hit(text) => Some(text),
            Lookup::Expired => {
                self.remove_expired(key);
                None
            }
            Lookup::Missing => None,
        }
    }

    // == Delete ==
    /// Removes `key`. Returns whether a live entry existed.
    pub fn delete(&mut self, key: &str) -> bool {
        let existed = self
            .entries
            .get(key)
            .map(|entry| !entry.is_expired())
            .unwrap_or(false);
        self.remove(key);
        existed
    }

    /// Keys starting with `prefix`, anchored at position 0.
    pub fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.entries
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect()
    }

    /// Removes `keys`, counting them as group deletions. Returns how many existed.
    pub fn remove_group_keys(&mut self, keys: &[String]) -> usize {
        let removed = keys.iter().filter(|key| self.remove(key)).count();
        self.accounting_mut().stats.record_group_deletions(removed);
        removed
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.accounting_mut().lru.clear();
    }

    // == Cleanup Expired ==
    /// Removes all expired entries. Returns the number removed.
    pub fn cleanup_expired(&mut self) -> usize {
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired())
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            self.remove(key);
        }
        expired.len()
    }

    pub fn stats(&self) -> CacheStats {
        let accounting = self.accounting();
        let mut stats = accounting.stats.clone();
        stats.set_occupancy(self.entries.len(), accounting.lru.total_size());
        stats
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_size(&self) -> usize {
        self.accounting().lru.total_size()
    }

    fn remove(&mut self, key: &str) -> bool {
        self.accounting_mut().lru.remove(key);
        self.entries.remove(key).is_some()
    }
}

impl fmt::Debug for LruStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LruStore")
            .field("entries", &self.entries.len())
            .field("total_size", &self.total_size())
            .field("max_size", &self.max_size)
            .finish_non_exhaustive()
    }
}

// == Bounded Memory Store ==
/// Process-local [`StorageBackend`]. Cloning shares the same store.
///
/// Lookups hold the read side of the lock, so reads of unrelated keys run
/// concurrently. Writes, deletes and expired-entry removal take the write side.
#[derive(Debug, Clone)]
pub struct BoundedMemoryStore {
    inner: Arc<RwLock<LruStore>>,
}

impl BoundedMemoryStore {
    pub fn new(options: MemoryStoreOptions) -> Self {
        Self {
            inner: Arc::new(RwLock::new(LruStore::new(options))),
        }
    }

    /// Unbounded store using the default length function.
    pub fn unbounded() -> Self {
        Self::new(MemoryStoreOptions::default())
    }

    pub async fn stats(&self) -> CacheStats {
        self.inner.read().await.stats()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    /// Drops expired entries ahead of their next lookup.
    pub async fn purge_expired(&self) -> usize {
        self.inner.write().await.cleanup_expired()
    }
}

impl Default for BoundedMemoryStore {
    fn default() -> Self {
        Self::unbounded()
    }
}

#[async_trait]
impl StorageBackend for BoundedMemoryStore {
    async fn set(&self, ns: &KeyNamespace, key: &str, value: &str, options: SetOptions) -> Result<()> {
        if key.is_empty() {
            return Err(CacheError::InvalidRequest("Key cannot be empty".to_string()));
        }
        let key = ns.key(key);
        self.inner
            .write()
            .await
            .set(&key, value, options.effective_ttl());
        Ok(())
    }

    async fn get(&self, ns: &KeyNamespace, key: &str) -> Result<Option<String>> {
        let key = ns.key(key);
        // The read guard is released before any removal below
        let found = self.inner.read().await.lookup(&key);
        match found {
            Lookup::Hit(text) => Ok(Some(text)),
            Lookup::Expired => {
                self.inner.write().await.remove_expired(&key);
                Ok(None)
            }
            Lookup::Missing => Ok(None),
        }
    }

    async fn delete(&self, ns: &KeyNamespace, key: &str) -> Result<bool> {
        let key = ns.key(key);
        Ok(self.inner.write().await.delete(&key))
    }

    async fn expire_group(&self, ns: &KeyNamespace, group: Option<&str>) -> Result<()> {
        let Some(group) = ns.resolve_group(group) else {
            return Ok(());
        };

        let keys = self.inner.read().await.keys_with_prefix(group);
        if keys.is_empty() {
            return Ok(());
        }

        let removed = self.inner.write().await.remove_group_keys(&keys);
        debug!(group, removed, "expired memory cache group");
        Ok(())
    }

    async fn flush(&self) -> Result<()> {
        self.inner.write().await.clear();
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
