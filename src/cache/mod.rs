//! Cache Module
//!
//! Process-local storage backend with TTL expiration and size-bounded LRU eviction.

mod entry;
mod lru;
mod stats;
mod store;


// Re-export public types
pub use entry::{current_timestamp_ms, default_length, CacheEntry, LengthFn, StoredValue};
pub use lru::LruLedger;
pub use stats::CacheStats;
pub use store::{BoundedMemoryStore, Lookup, LruStore, MemoryStoreOptions};
