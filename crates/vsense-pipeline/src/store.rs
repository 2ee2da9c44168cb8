//! Video record store.
//!
//! The persistent record store is an external collaborator; the
//! pipeline needs only per-document atomic get/put. The Redis
//! implementation keeps each record as a single JSON document, the
//! in-memory one backs tests and single-process deployments.

use std::collections::HashMap;

use async_trait::async_trait;
use redis::AsyncCommands;
use thiserror::Error;
use tokio::sync::RwLock;

use vsense_models::{VideoId, VideoRecord};

/// Result type for record store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors from the record store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Record store unavailable: {0}")]
    Unavailable(String),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Document store for video records.
#[async_trait]
pub trait VideoStore: Send + Sync {
    /// Fetch a record by id.
    async fn get(&self, id: &VideoId) -> StoreResult<Option<VideoRecord>>;

    /// Write a record wholesale. Per-document atomic.
    async fn put(&self, record: &VideoRecord) -> StoreResult<()>;
}

/// In-memory record store.
#[derive(Default)]
pub struct MemoryVideoStore {
    records: RwLock<HashMap<String, VideoRecord>>,
}

impl MemoryVideoStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record, returning the store for chaining in tests.
    pub async fn insert(&self, record: VideoRecord) {
        self.records
            .write()
            .await
            .insert(record.id.to_string(), record);
    }
}

#[async_trait]
impl VideoStore for MemoryVideoStore {
    async fn get(&self, id: &VideoId) -> StoreResult<Option<VideoRecord>> {
        Ok(self.records.read().await.get(id.as_str()).cloned())
    }

    async fn put(&self, record: &VideoRecord) -> StoreResult<()> {
        self.records
            .write()
            .await
            .insert(record.id.to_string(), record.clone());
        Ok(())
    }
}

/// Redis-backed record store. One JSON document per record.
pub struct RedisVideoStore {
    client: redis::Client,
}

impl RedisVideoStore {
    pub fn new(redis_url: &str) -> StoreResult<Self> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self { client })
    }

    pub fn from_env() -> StoreResult<Self> {
        let url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
        Self::new(&url)
    }

    fn record_key(id: &VideoId) -> String {
        format!("video:record:{}", id)
    }
}

#[async_trait]
impl VideoStore for RedisVideoStore {
    async fn get(&self, id: &VideoId) -> StoreResult<Option<VideoRecord>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let raw: Option<String> = conn.get(Self::record_key(id)).await?;
        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn put(&self, record: &VideoRecord) -> StoreResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let json = serde_json::to_string(record)?;
        conn.set::<_, _, ()>(Self::record_key(&record.id), json)
            .await?;
        Ok(())
    }
}
