//! Analysis trigger listener.
//!
//! Upload and reprocess handlers run in a separate service; they ask
//! for analysis by publishing a request on a Redis channel. Each
//! request starts a run fire-and-forget, so a slow video never delays
//! the next request.

use std::sync::Arc;

use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{error, info, warn};

use vsense_models::VideoId;

use crate::error::PipelineResult;
use crate::run::Pipeline;
use crate::store::StoreError;

/// Channel carrying analysis requests.
pub const TRIGGER_CHANNEL: &str = "video:analyze";

/// One analysis request as published by the upload/reprocess handlers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    pub video_id: VideoId,
    /// Reset the record before running
    #[serde(default)]
    pub reprocess: bool,
}

/// Subscribes to the trigger channel and dispatches runs.
pub struct TriggerListener {
    client: redis::Client,
    pipeline: Arc<Pipeline>,
}

impl TriggerListener {
    pub fn new(redis_url: &str, pipeline: Arc<Pipeline>) -> PipelineResult<Self> {
        let client = redis::Client::open(redis_url).map_err(StoreError::from)?;
        Ok(Self { client, pipeline })
    }

    pub fn from_env(pipeline: Arc<Pipeline>) -> PipelineResult<Self> {
        let url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
        Self::new(&url, pipeline)
    }

    /// Listen until the shutdown signal flips.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> PipelineResult<()> {
        let mut pubsub = self
            .client
            .get_async_pubsub()
            .await
            .map_err(StoreError::from)?;
        pubsub
            .subscribe(TRIGGER_CHANNEL)
            .await
            .map_err(StoreError::from)?;

        info!("Listening for analysis requests on {}", TRIGGER_CHANNEL);

        let mut messages = pubsub.into_on_message();
        loop {
            tokio::select! {
                maybe_msg = messages.next() => {
                    let Some(msg) = maybe_msg else {
                        warn!("Trigger subscription closed");
                        return Ok(());
                    };
                    self.handle_message(&msg).await;
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("Trigger listener shutting down");
                        return Ok(());
                    }
                }
            }
        }
    }

    async fn handle_message(&self, msg: &redis::Msg) {
        let payload: String = match msg.get_payload() {
            Ok(p) => p,
            Err(e) => {
                warn!("Unreadable trigger payload: {}", e);
                return;
            }
        };

        let request: AnalyzeRequest = match serde_json::from_str(&payload) {
            Ok(r) => r,
            Err(e) => {
                warn!("Malformed analysis request: {}", e);
                return;
            }
        };

        info!(
            video_id = %request.video_id,
            reprocess = request.reprocess,
            "Analysis requested"
        );

        let outcome = if request.reprocess {
            self.pipeline.reprocess(&request.video_id).await
        } else {
            self.pipeline.start_run(&request.video_id).await
        };

        if let Err(e) = outcome {
            error!(video_id = %request.video_id, "Could not start analysis: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_format() {
        let json = r#"{"videoId":"vid-1","reprocess":true}"#;
        let request: AnalyzeRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.video_id, VideoId::from("vid-1"));
        assert!(request.reprocess);
    }

    #[test]
    fn test_reprocess_defaults_false() {
        let json = r#"{"videoId":"vid-2"}"#;
        let request: AnalyzeRequest = serde_json::from_str(json).unwrap();
        assert!(!request.reprocess);
    }
}
