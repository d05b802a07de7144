//! LRU Ledger Module
//!
//! Tracks recency order and aggregate size for bound-enforced eviction.

use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Copy)]
struct Slot {
    tick: u64,
    size: usize,
}

// == LRU Ledger ==
/// Recency order plus per-key sizes.
///
/// Every insert or touch stamps the key with a fresh tick. The smallest
/// tick in `recency` is the least recently used key, so touch and evict
/// are logarithmic rather than a scan of the whole order.
#[derive(Debug, Default)]
pub struct LruLedger {
    tick: u64,
    recency: BTreeMap<u64, String>,
    slots: HashMap<String, Slot>,
    total: usize,
}

impl LruLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    // == Insert ==
    /// Records `key` with `size` as most recently used, replacing a prior size.
    pub fn insert(&mut self, key: &str, size: usize) {
        self.remove(key);
        let tick = self.next_tick();
        self.recency.insert(tick, key.to_string());
        self.slots.insert(key.to_string(), Slot { tick, size });
        self.total += size;
    }

    // == Touch ==
    /// Marks a tracked key as most recently used.
    pub fn touch(&mut self, key: &str) {
        let Some(old_tick) = self.slots.get(key).map(|slot| slot.tick) else {
            return;
        };
        let tick = self.next_tick();
        if let Some(owned) = self.recency.remove(&old_tick) {
            self.recency.insert(tick, owned);
        }
        if let Some(slot) = self.slots.get_mut(key) {
            slot.tick = tick;
        }
    }

    // == Remove ==
    /// Forgets `key`. Returns whether it was tracked.
    pub fn remove(&mut self, key: &str) -> bool {
        match self.slots.remove(key) {
            Some(slot) => {
                self.total -= slot.size;
                self.recency.remove(&slot.tick);
                true
            }
            None => false,
        }
    }

    // == Evict Oldest ==
    /// Removes and returns the least recently used key.
    pub fn evict_oldest(&mut self) -> Option<String> {
        let (_, key) = self.recency.pop_first()?;
        if let Some(slot) = self.slots.remove(&key) {
            self.total -= slot.size;
        }
        Some(key)
    }

    /// Aggregate size of every tracked key.
    pub fn total_size(&self) -> usize {
        self.total
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn clear(&mut self) {
        self.recency.clear();
        self.slots.clear();
        self.total = 0;
    }
}
