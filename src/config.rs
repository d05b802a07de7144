//! Configuration Module
//!
//! Loads server and cache configuration from environment variables.

use std::env;
use std::str::FromStr;

use crate::remote::{RemoteOptions, DEFAULT_SCAN_COUNT};

// == Backend Kind ==
/// Which storage backend the server runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Memory,
    Redis,
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "mem" | "lru" => Ok(BackendKind::Memory),
            "redis" => Ok(BackendKind::Redis),
            other => Err(format!("unknown cache backend '{other}'")),
        }
    }
}

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Global cache switch
    pub enabled: bool,
    /// Human-readable cache duration, e.g. "10 seconds"
    pub duration: String,
    pub backend: BackendKind,
    /// Connection URL for the redis backend
    pub redis_url: String,
    /// Keys requested per SCAN step during group expiry
    pub scan_count: usize,
    /// Aggregate size bound of the memory backend
    pub max_size: usize,
    /// HTTP server port
    pub server_port: u16,
    /// Memory backend expiry sweep interval in seconds
    pub cleanup_interval: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_ENABLED` - Global cache switch (default: true)
    /// - `CACHE_DURATION` - Cache duration (default: "1 hour")
    /// - `CACHE_BACKEND` - `memory` or `redis` (default: memory)
    /// - `REDIS_URL` - Redis URL (default: redis://127.0.0.1:6379)
    /// - `REDIS_SCAN_COUNT` - SCAN page size (default: 100)
    /// - `CACHE_MAX_SIZE` - Memory backend size bound (default: 10000000)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CLEANUP_INTERVAL` - Expiry sweep frequency in seconds (default: 30)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            enabled: env_parse("CACHE_ENABLED").unwrap_or(defaults.enabled),
            duration: env::var("CACHE_DURATION").unwrap_or(defaults.duration),
            backend: env_parse("CACHE_BACKEND").unwrap_or(defaults.backend),
            redis_url: env::var("REDIS_URL").unwrap_or(defaults.redis_url),
            scan_count: env_parse("REDIS_SCAN_COUNT").unwrap_or(defaults.scan_count),
            max_size: env_parse("CACHE_MAX_SIZE").unwrap_or(defaults.max_size),
            server_port: env_parse("SERVER_PORT").unwrap_or(defaults.server_port),
            cleanup_interval: env_parse("CLEANUP_INTERVAL").unwrap_or(defaults.cleanup_interval),
        }
    }

    pub fn remote_options(&self) -> RemoteOptions {
        RemoteOptions {
            url: self.redis_url.clone(),
            scan_count: self.scan_count,
        }
    }
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enabled: true,
            duration: "1 hour".to_string(),
            backend: BackendKind::Memory,
            redis_url: RemoteOptions::default().url,
            scan_count: DEFAULT_SCAN_COUNT,
            max_size: 10_000_000,
            server_port: 3000,
            cleanup_interval: 30,
        }
    }
}
