//! Cache Statistics Module
//!
//! Counters kept by the memory store.

use serde::Serialize;

// == Cache Stats ==
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct CacheStats {
    /// Lookups that found a live entry
    pub hits: u64,
    /// Lookups that found nothing or an expired entry
    pub misses: u64,
    /// Entries dropped to keep the aggregate size within bound
    pub evictions: u64,
    /// Entries removed by a group expiry
    pub group_deletions: u64,
    /// Current number of entries
    pub total_entries: usize,
    /// Current aggregate size as computed by the length function
    pub total_size: usize,
}

impl CacheStats {
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 if nothing was looked up.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    pub fn record_group_deletions(&mut self, count: usize) {
        self.group_deletions += count as u64;
    }

    /// Updates the occupancy gauges.
    pub fn set_occupancy(&mut self, entries: usize, size: usize) {
        self.total_entries = entries;
        self.total_size = size;
    }
}
