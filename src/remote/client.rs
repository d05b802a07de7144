//! Remote Client Module
//!
//! The narrow set of key/value service commands the networked store relies
//! on, with a Redis implementation.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use tokio::sync::RwLock;
use tracing::info;

use crate::error::{CacheError, Result};

// == Remote Client ==
/// Commands consumed from the networked key/value service.
#[async_trait]
pub trait RemoteClient: Send + Sync + 'static {
    /// Writes `value` expiring after `ttl_secs` seconds.
    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()>;

    /// Reads many keys at once; the result is positional.
    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<String>>>;

    /// Deletes keys, returning how many existed.
    async fn del(&self, keys: &[String]) -> Result<u64>;

    /// Drops every key in the selected database.
    async fn flush_all(&self) -> Result<()>;

    /// One step of a cursor scan. A returned cursor of 0 ends the scan.
    async fn scan(&self, cursor: u64, pattern: &str, count: usize) -> Result<(u64, Vec<String>)>;

    /// Releases the connection.
    async fn quit(&self) -> Result<()>;
}

// == Redis Client ==
/// [`RemoteClient`] backed by a Redis connection manager, which reconnects
/// on its own after transient failures.
pub struct RedisClient {
    conn: RwLock<Option<ConnectionManager>>,
}

impl RedisClient {
    /// Opens a managed connection to `url` (e.g. "redis://127.0.0.1:6379").
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let manager = client.get_connection_manager().await?;
        info!(url, "connected to redis");

        Ok(Self {
            conn: RwLock::new(Some(manager)),
        })
    }

    async fn connection(&self) -> Result<ConnectionManager> {
        self.conn
            .read()
            .await
            .clone()
            .ok_or_else(|| CacheError::Backend("redis connection closed".to_string()))
    }
}

#[async_trait]
impl RemoteClient for RedisClient {
    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()> {
        let mut conn = self.connection().await?;
        let _: () = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(ttl_secs)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<String>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.connection().await?;
        let values: Vec<Option<String>> = redis::cmd("MGET").arg(keys).query_async(&mut conn).await?;
        Ok(values)
    }

    async fn del(&self, keys: &[String]) -> Result<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.connection().await?;
        let removed: u64 = redis::cmd("DEL").arg(keys).query_async(&mut conn).await?;
        Ok(removed)
    }

    async fn flush_all(&self) -> Result<()> {
        let mut conn = self.connection().await?;
        let _: () = redis::cmd("FLUSHDB").query_async(&mut conn).await?;
        Ok(())
    }

    async fn scan(&self, cursor: u64, pattern: &str, count: usize) -> Result<(u64, Vec<String>)> {
        let mut conn = self.connection().await?;
        let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
            .arg(cursor)
            .arg("MATCH")
            .arg(pattern)
            .arg("COUNT")
            .arg(count)
            .query_async(&mut conn)
            .await?;
        Ok((next, keys))
    }

    async fn quit(&self) -> Result<()> {
        if self.conn.write().await.take().is_some() {
            info!("redis connection released");
        }
        Ok(())
    }
}

impl std::fmt::Debug for RedisClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisClient").finish_non_exhaustive()
    }
}
