//! Bounded polling driver for the moderation service.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use vsense_models::{ModerationFinding, StorageRef};

use crate::error::{ModerationError, ModerationResult};
use crate::metrics::{record_job, record_poll};
use crate::service::{ModerationJobStatus, ModerationService};

/// Progress span owned by the moderation stage.
pub const MODERATION_PROGRESS_START: u8 = 40;
pub const MODERATION_PROGRESS_SUBMITTED: u8 = 50;
pub const MODERATION_PROGRESS_END: u8 = 80;

/// Observer invoked after each progress-relevant step of the polling
/// loop, so the caller can persist and fan out the update.
#[async_trait]
pub trait PollObserver: Send + Sync {
    async fn on_progress(&self, progress: u8, message: &str);
}

/// Moderation client configuration.
#[derive(Debug, Clone)]
pub struct ModerationConfig {
    /// Service base URL
    pub base_url: String,
    /// API key
    pub api_key: String,
    /// Minimum confidence for the service to report a finding (0-100)
    pub min_confidence: u8,
    /// Maximum polling attempts before timing out
    pub max_poll_attempts: u32,
    /// Fixed interval between polls
    pub poll_interval: Duration,
    /// Settle delay between submission and the first poll
    pub submit_settle_delay: Duration,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8600".to_string(),
            api_key: String::new(),
            min_confidence: 70,
            max_poll_attempts: 60,
            poll_interval: Duration::from_millis(5000),
            submit_settle_delay: Duration::from_millis(2000),
        }
    }
}

impl ModerationConfig {
    /// Create config from environment variables.
    pub fn from_env() -> ModerationResult<Self> {
        Ok(Self {
            base_url: std::env::var("MODERATION_API_URL")
                .map_err(|_| ModerationError::config_error("MODERATION_API_URL not set"))?,
            api_key: std::env::var("MODERATION_API_KEY").unwrap_or_default(),
            min_confidence: std::env::var("MODERATION_MIN_CONFIDENCE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(70),
            max_poll_attempts: std::env::var("MODERATION_MAX_POLL_ATTEMPTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(60),
            poll_interval: Duration::from_millis(
                std::env::var("MODERATION_POLL_INTERVAL_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5000),
            ),
            submit_settle_delay: Duration::from_millis(
                std::env::var("MODERATION_SUBMIT_SETTLE_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(2000),
            ),
        })
    }
}

/// Moderation client: submits a job and polls to a terminal state.
///
/// Errors raised here (submission, polling, explicit failure, timeout)
/// are the caller's to absorb; this client never swallows them itself.
pub struct ModerationClient {
    service: Arc<dyn ModerationService>,
    config: ModerationConfig,
}

impl ModerationClient {
    pub fn new(service: Arc<dyn ModerationService>, config: ModerationConfig) -> Self {
        Self { service, config }
    }

    pub fn config(&self) -> &ModerationConfig {
        &self.config
    }

    /// Analyze an asset.
    ///
    /// Assets whose storage provider cannot be reached by the external
    /// service return an empty finding list immediately; the caller is
    /// responsible for the parity progress advance in that case.
    pub async fn analyze(
        &self,
        storage: &StorageRef,
        observer: &dyn PollObserver,
    ) -> ModerationResult<Vec<ModerationFinding>> {
        let Some(asset_key) = storage.remote_key() else {
            debug!("Asset not in remote storage, skipping external moderation");
            return Ok(Vec::new());
        };

        let job_handle = self.service.submit(asset_key).await?;
        info!("Moderation job submitted: {}", job_handle);

        observer
            .on_progress(
                MODERATION_PROGRESS_SUBMITTED,
                "Content moderation job submitted...",
            )
            .await;

        tokio::time::sleep(self.config.submit_settle_delay).await;

        let progress_per_poll =
            (MODERATION_PROGRESS_END - MODERATION_PROGRESS_SUBMITTED) as f64
                / self.config.max_poll_attempts as f64;
        let mut attempts: u32 = 0;

        while attempts < self.config.max_poll_attempts {
            attempts += 1;

            let poll = self.service.poll(&job_handle).await?;
            record_poll();

            let progress = (MODERATION_PROGRESS_SUBMITTED as f64
                + progress_per_poll * attempts as f64)
                .round()
                .min(MODERATION_PROGRESS_END as f64) as u8;

            observer
                .on_progress(
                    progress,
                    &format!("Analyzing video content... ({}%)", progress),
                )
                .await;

            match poll.status {
                ModerationJobStatus::Succeeded => {
                    observer
                        .on_progress(
                            MODERATION_PROGRESS_END,
                            "Content moderation completed successfully",
                        )
                        .await;
                    info!(
                        "Moderation job {} completed with {} findings",
                        job_handle,
                        poll.findings.len()
                    );
                    record_job("succeeded");
                    return Ok(poll.findings);
                }
                ModerationJobStatus::Failed => {
                    record_job("failed");
                    return Err(ModerationError::job_failed(
                        poll.status_message
                            .unwrap_or_else(|| "Unknown error".to_string()),
                    ));
                }
                ModerationJobStatus::InProgress => {}
            }

            tokio::time::sleep(self.config.poll_interval).await;
        }

        record_job("timeout");
        Err(ModerationError::Timeout { attempts })
    }
}
