//! Batch Loader Module
//!
//! Coalesces reads issued in the same scheduler tick into one MGET and
//! deduplicates concurrent reads of the same key.

use std::collections::HashMap;
use std::mem;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::oneshot;
use tracing::debug;

use crate::error::{CacheError, Result};
use crate::remote::RemoteClient;

type Reply = std::result::Result<Option<String>, CacheError>;

#[derive(Default)]
struct Pending {
    waiters: HashMap<String, Vec<oneshot::Sender<Reply>>>,
    scheduled: bool,
}

// == Batch Loader ==
pub struct BatchLoader<C> {
    client: Arc<C>,
    pending: Arc<Mutex<Pending>>,
}

impl<C> Clone for BatchLoader<C> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            pending: Arc::clone(&self.pending),
        }
    }
}

impl<C: RemoteClient> BatchLoader<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self {
            client,
            pending: Arc::new(Mutex::new(Pending::default())),
        }
    }

    /// Queues `key` for the next batch and waits for its value.
    pub async fn load(&self, key: &str) -> Result<Option<String>> {
        let (tx, rx) = oneshot::channel();

        let schedule = {
            let mut pending = self.lock();
            pending.waiters.entry(key.to_string()).or_default().push(tx);
            !mem::replace(&mut pending.scheduled, true)
        };

        if schedule {
            let loader = self.clone();
            tokio::spawn(async move {
                // Let every task already runnable enqueue its key first
                tokio::task::yield_now().await;
                loader.dispatch().await;
            });
        }

        rx.await
            .map_err(|_| CacheError::Backend("batched read was dropped".to_string()))?
    }

    async fn dispatch(&self) {
        let waiters = {
            let mut pending = self.lock();
            pending.scheduled = false;
            mem::take(&mut pending.waiters)
        };
        if waiters.is_empty() {
            return;
        }

        let keys: Vec<String> = waiters.keys().cloned().collect();
        debug!(keys = keys.len(), "dispatching batched read");

        match self.client.mget(&keys).await {
            Ok(values) => {
                let mut values = values.into_iter();
                let mut waiters = waiters;
                for key in &keys {
                    let value = values.next().flatten();
                    for tx in waiters.remove(key).unwrap_or_default() {
                        let _ = tx.send(Ok(value.clone()));
                    }
                }
            }
            Err(err) => {
                for tx in waiters.into_values().flatten() {
                    let _ = tx.send(Err(err.clone()));
                }
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, Pending> {
        self.pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
