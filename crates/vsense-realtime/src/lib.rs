//! Per-user realtime event channel.
//!
//! Processing events are fanned out to the owning user's live session
//! over Redis Pub/Sub. Delivery is best-effort with no backpressure:
//! a user without a connected session simply has no subscriber.
//!
//! The channel is an injected dependency rather than process-global
//! state, so tests can substitute a recording fake.

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::Stream;
use redis::AsyncCommands;
use thiserror::Error;
use tracing::debug;

use vsense_models::ProcessingEvent;

/// Result type for channel operations.
pub type RealtimeResult<T> = Result<T, RealtimeError>;

/// Errors from the realtime channel.
///
/// Callers on the pipeline side treat every variant as non-fatal.
#[derive(Debug, Error)]
pub enum RealtimeError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Outbound side of the realtime channel.
#[async_trait]
pub trait RealtimeChannel: Send + Sync {
    /// Send an event to a single user's session(s). Best-effort.
    async fn send_to_user(&self, user_id: &str, event: &ProcessingEvent) -> RealtimeResult<()>;
}

/// Redis Pub/Sub implementation.
///
/// Each user has a dedicated channel; session bridges subscribe to
/// their own user's channel only, so events are never broadcast.
pub struct RedisRealtimeChannel {
    client: redis::Client,
}

impl RedisRealtimeChannel {
    /// Create a new channel over the given Redis URL.
    pub fn new(redis_url: &str) -> RealtimeResult<Self> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self { client })
    }

    /// Create from the `REDIS_URL` environment variable.
    pub fn from_env() -> RealtimeResult<Self> {
        let url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
        Self::new(&url)
    }

    /// Channel name for a user.
    pub fn channel_name(user_id: &str) -> String {
        format!("user:{}", user_id)
    }

    /// Subscribe to one user's events.
    /// Returns a pinned stream that can be polled with `.next()`.
    pub async fn subscribe(
        &self,
        user_id: &str,
    ) -> RealtimeResult<Pin<Box<dyn Stream<Item = ProcessingEvent> + Send>>> {
        use futures_util::StreamExt;

        let mut pubsub = self.client.get_async_pubsub().await?;
        let channel = Self::channel_name(user_id);

        pubsub.subscribe(&channel).await?;

        let stream = pubsub.into_on_message().filter_map(|msg| async move {
            let payload: String = msg.get_payload().ok()?;
            serde_json::from_str(&payload).ok()
        });

        Ok(Box::pin(stream))
    }
}

#[async_trait]
impl RealtimeChannel for RedisRealtimeChannel {
    async fn send_to_user(&self, user_id: &str, event: &ProcessingEvent) -> RealtimeResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let channel = Self::channel_name(user_id);
        let payload = serde_json::to_string(event)?;

        debug!("Publishing {} to {}", event.event_name(), channel);
        conn.publish::<_, _, ()>(channel, payload).await?;

        Ok(())
    }
}
