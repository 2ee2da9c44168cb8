//! Cache service over Redis.
//!
//! The cache is an availability optimization only: every method degrades
//! to "always miss, never persist" when Redis is down, and no error ever
//! reaches a caller.

use async_trait::async_trait;
use redis::AsyncCommands;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

/// Generic key-value cache with TTL and pattern delete.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Get a raw value. Miss and unavailable are indistinguishable.
    async fn get(&self, key: &str) -> Option<String>;

    /// Set a value with a TTL in seconds. Returns whether it was stored.
    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> bool;

    /// Whether a key exists. Unavailable reads as absent.
    async fn exists(&self, key: &str) -> bool;

    /// Delete a key. Returns whether a delete was issued.
    async fn delete(&self, key: &str) -> bool;

    /// Delete all keys matching a glob pattern. Returns the count deleted.
    async fn delete_pattern(&self, pattern: &str) -> u64;
}

/// Typed helpers over the raw cache surface.
pub async fn get_json<T: DeserializeOwned>(cache: &dyn Cache, key: &str) -> Option<T> {
    let raw = cache.get(key).await?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Cache value for {} failed to decode: {}", key, e);
            None
        }
    }
}

pub async fn set_json<T: Serialize>(cache: &dyn Cache, key: &str, value: &T, ttl_secs: u64) -> bool {
    match serde_json::to_string(value) {
        Ok(raw) => cache.set(key, &raw, ttl_secs).await,
        Err(e) => {
            warn!("Cache value for {} failed to encode: {}", key, e);
            false
        }
    }
}

/// Redis-backed cache.
///
/// Construction never fails: a bad URL yields a cache that always misses.
#[derive(Clone)]
pub struct RedisCache {
    client: Option<redis::Client>,
}

impl RedisCache {
    /// Create a cache over the given Redis URL.
    pub fn new(redis_url: &str) -> Self {
        let client = match redis::Client::open(redis_url) {
            Ok(c) => Some(c),
            Err(e) => {
                warn!("Cache unavailable, operating without it: {}", e);
                None
            }
        };
        Self { client }
    }

    /// Create from the `REDIS_URL` environment variable.
    pub fn from_env() -> Self {
        let url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
        Self::new(&url)
    }

    /// A cache that is permanently unavailable. Useful in tests and for
    /// deployments without Redis.
    pub fn disabled() -> Self {
        Self { client: None }
    }

    async fn connection(&self) -> Option<redis::aio::MultiplexedConnection> {
        let client = self.client.as_ref()?;
        match client.get_multiplexed_async_connection().await {
            Ok(conn) => Some(conn),
            Err(e) => {
                debug!("Cache connection failed: {}", e);
                None
            }
        }
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &str) -> Option<String> {
        let mut conn = self.connection().await?;
        match conn.get::<_, Option<String>>(key).await {
            Ok(value) => value,
            Err(e) => {
                debug!("Cache GET error for {}: {}", key, e);
                None
            }
        }
    }

    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> bool {
        let Some(mut conn) = self.connection().await else {
            return false;
        };
        match conn.set_ex::<_, _, ()>(key, value, ttl_secs).await {
            Ok(()) => true,
            Err(e) => {
                debug!("Cache SET error for {}: {}", key, e);
                false
            }
        }
    }

    async fn exists(&self, key: &str) -> bool {
        let Some(mut conn) = self.connection().await else {
            return false;
        };
        match conn.exists::<_, bool>(key).await {
            Ok(present) => present,
            Err(e) => {
                debug!("Cache EXISTS error for {}: {}", key, e);
                false
            }
        }
    }

    async fn delete(&self, key: &str) -> bool {
        let Some(mut conn) = self.connection().await else {
            return false;
        };
        match conn.del::<_, ()>(key).await {
            Ok(()) => true,
            Err(e) => {
                debug!("Cache DELETE error for {}: {}", key, e);
                false
            }
        }
    }

    async fn delete_pattern(&self, pattern: &str) -> u64 {
        let Some(mut conn) = self.connection().await else {
            return 0;
        };
        let keys: Vec<String> = match conn.keys(pattern).await {
            Ok(keys) => keys,
            Err(e) => {
                debug!("Cache KEYS error for {}: {}", pattern, e);
                return 0;
            }
        };
        if keys.is_empty() {
            return 0;
        }
        let count = keys.len() as u64;
        match conn.del::<_, ()>(keys).await {
            Ok(()) => count,
            Err(e) => {
                debug!("Cache DELETE PATTERN error for {}: {}", pattern, e);
                0
            }
        }
    }
}
