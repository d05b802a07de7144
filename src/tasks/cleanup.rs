//! Expiry Sweep Task
//!
//! The memory store drops expired entries lazily on lookup. This task
//! sweeps the ones nobody looks up again.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::BoundedMemoryStore;

/// Spawns a task purging expired entries from `store` every
/// `cleanup_interval_secs` seconds (at least one).
///
/// Abort the returned handle during shutdown.
///
/// # Example
/// ```ignore
/// let store = BoundedMemoryStore::unbounded();
/// let cleanup_handle = spawn_cleanup_task(store.clone(), 30);
/// // Later, during shutdown:
/// cleanup_handle.abort();
/// ```
pub fn spawn_cleanup_task(store: BoundedMemoryStore, cleanup_interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(cleanup_interval_secs.max(1));

    tokio::spawn(async move {
        info!(
            interval_secs = interval.as_secs(),
            "starting cache expiry sweep"
        );

        loop {
            tokio::time::sleep(interval).await;

            let removed = store.purge_expired().await;
            if removed > 0 {
                info!(removed, "expiry sweep removed entries");
            } else {
                debug!("expiry sweep found nothing to remove");
            }
        }
    })
}
