//! In-Process Remote Module
//!
//! A [`RemoteClient`] that keeps its data in process. It follows Redis
//! semantics for expiry, MGET and cursor SCAN, and can be told to fail so
//! outage handling can be exercised without a server.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::cache::current_timestamp_ms;
use crate::error::{CacheError, Result};
use crate::remote::RemoteClient;

#[derive(Debug, Clone)]
struct RemoteValue {
    value: String,
    expires_at: u64,
}

// == In-Memory Remote ==
#[derive(Debug, Default)]
pub struct InMemoryRemote {
    data: Mutex<BTreeMap<String, RemoteValue>>,
    scans: Mutex<HashMap<u64, Vec<String>>>,
    next_scan_id: AtomicU64,
    unavailable: AtomicBool,
    failing_scans: AtomicBool,
    failing_writes: AtomicBool,
    mget_calls: AtomicUsize,
}

impl InMemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every command fail as if the service were unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Makes SCAN fail while other commands keep working.
    pub fn set_failing_scans(&self, failing: bool) {
        self.failing_scans.store(failing, Ordering::SeqCst);
    }

    /// Makes SET fail while reads keep working.
    pub fn set_failing_writes(&self, failing: bool) {
        self.failing_writes.store(failing, Ordering::SeqCst);
    }

    /// Number of MGET round trips served so far.
    pub fn mget_calls(&self) -> usize {
        self.mget_calls.load(Ordering::SeqCst)
    }

    /// Live keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let now = current_timestamp_ms();
        self.lock()
            .iter()
            .filter(|(_, v)| v.expires_at > now)
            .map(|(k, _)| k.clone())
            .collect()
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(CacheError::Backend("connection refused".to_string()));
        }
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, RemoteValue>> {
        self.data.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl RemoteClient for InMemoryRemote {
    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()> {
        self.check_available()?;
        if self.failing_writes.load(Ordering::SeqCst) {
            return Err(CacheError::Backend("write rejected".to_string()));
        }
        let expires_at = current_timestamp_ms().saturating_add(ttl_secs.saturating_mul(1000));
        self.lock().insert(
            key.to_string(),
            RemoteValue {
                value: value.to_string(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<String>>> {
        self.check_available()?;
        self.mget_calls.fetch_add(1, Ordering::SeqCst);
        let now = current_timestamp_ms();
        let data = self.lock();
        Ok(keys
            .iter()
            .map(|key| {
                data.get(key)
                    .filter(|v| v.expires_at > now)
                    .map(|v| v.value.clone())
            })
            .collect())
    }

    async fn del(&self, keys: &[String]) -> Result<u64> {
        self.check_available()?;
        let now = current_timestamp_ms();
        let mut data = self.lock();
        let removed = keys
            .iter()
            .filter_map(|key| data.remove(key))
            .filter(|v| v.expires_at > now)
            .count();
        Ok(removed as u64)
    }

    async fn flush_all(&self) -> Result<()> {
        self.check_available()?;
        self.lock().clear();
        Ok(())
    }

    async fn scan(&self, cursor: u64, pattern: &str, count: usize) -> Result<(u64, Vec<String>)> {
        self.check_available()?;
        if self.failing_scans.load(Ordering::SeqCst) {
            return Err(CacheError::Backend("scan aborted".to_string()));
        }

        // A scan walks a snapshot of the keys taken at cursor 0, so keys
        // deleted mid-scan never shift later pages. The cursor packs the
        // snapshot id in the high 32 bits and the offset in the low 32.
        let mut scans = self.scans.lock().unwrap_or_else(|p| p.into_inner());
        let (id, offset) = if cursor == 0 {
            let id = self.next_scan_id.fetch_add(1, Ordering::SeqCst) + 1;
            scans.insert(id, self.lock().keys().cloned().collect());
            (id, 0usize)
        } else {
            (cursor >> 32, (cursor & 0xFFFF_FFFF) as usize)
        };
        let Some(snapshot) = scans.get(&id) else {
            return Err(CacheError::Backend(format!("invalid scan cursor {cursor}")));
        };

        let offset = offset.min(snapshot.len());
        let end = (offset + count.max(1)).min(snapshot.len());
        let now = current_timestamp_ms();
        let data = self.lock();
        let keys = snapshot[offset..end]
            .iter()
            .filter(|k| {
                data.get(k.as_str())
                    .is_some_and(|v| v.expires_at > now && glob_match(pattern, k))
            })
            .cloned()
            .collect();

        let next = if end >= snapshot.len() {
            scans.remove(&id);
            0
        } else {
            (id << 32) | end as u64
        };
        Ok((next, keys))
    }

    async fn quit(&self) -> Result<()> {
        Ok(())
    }
}

/// Redis-style glob match supporting `*`, `?` and backslash escapes.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();
    glob_match_from(&pattern, &text)
}

fn glob_match_from(pattern: &[char], text: &[char]) -> bool {
    match pattern.split_first() {
        None => text.is_empty(),
        Some((&'*', rest)) => (0..=text.len()).any(|i| glob_match_from(rest, &text[i..])),
        Some((&'?', rest)) => !text.is_empty() && glob_match_from(rest, &text[1..]),
        Some((&'\\', rest)) if !rest.is_empty() => {
            text.first() == Some(&rest[0]) && glob_match_from(&rest[1..], &text[1..])
        }
        Some((c, rest)) => text.first() == Some(c) && glob_match_from(rest, &text[1..]),
    }
}
