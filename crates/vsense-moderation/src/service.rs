//! Moderation service contract and HTTP implementation.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use vsense_models::ModerationFinding;

use crate::client::ModerationConfig;
use crate::error::{ModerationError, ModerationResult};

/// State of a submitted moderation job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModerationJobStatus {
    InProgress,
    Succeeded,
    Failed,
}

/// One poll's view of a moderation job.
#[derive(Debug, Clone, Deserialize)]
pub struct ModerationPoll {
    pub status: ModerationJobStatus,
    #[serde(default)]
    pub status_message: Option<String>,
    #[serde(default)]
    pub findings: Vec<ModerationFinding>,
}

/// The external moderation service at its interface boundary.
///
/// Submit a job referencing the asset by storage key, then poll the
/// returned handle until it reaches a terminal state.
#[async_trait]
pub trait ModerationService: Send + Sync {
    /// Submit a moderation job; returns an opaque job handle.
    async fn submit(&self, asset_key: &str) -> ModerationResult<String>;

    /// Poll a job's status.
    async fn poll(&self, job_handle: &str) -> ModerationResult<ModerationPoll>;
}

#[derive(Debug, Serialize)]
struct SubmitRequest<'a> {
    asset_key: &'a str,
    min_confidence: u8,
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    job_id: String,
}

/// HTTP implementation of the moderation service contract.
pub struct HttpModerationService {
    base_url: String,
    api_key: String,
    min_confidence: u8,
    client: Client,
}

impl HttpModerationService {
    /// Create a new service client.
    pub fn new(config: &ModerationConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            min_confidence: config.min_confidence,
            client: Client::new(),
        }
    }
}

#[async_trait]
impl ModerationService for HttpModerationService {
    async fn submit(&self, asset_key: &str) -> ModerationResult<String> {
        let url = format!("{}/v1/moderation/jobs", self.base_url);
        debug!("Submitting moderation job for {}", asset_key);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&SubmitRequest {
                asset_key,
                min_confidence: self.min_confidence,
            })
            .send()
            .await
            .map_err(|e| ModerationError::submit_failed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ModerationError::submit_failed(format!(
                "service returned {}",
                response.status()
            )));
        }

        let body: SubmitResponse = response
            .json()
            .await
            .map_err(|e| ModerationError::submit_failed(e.to_string()))?;

        Ok(body.job_id)
    }

    async fn poll(&self, job_handle: &str) -> ModerationResult<ModerationPoll> {
        let url = format!("{}/v1/moderation/jobs/{}", self.base_url, job_handle);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| ModerationError::poll_failed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ModerationError::poll_failed(format!(
                "service returned {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| ModerationError::poll_failed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poll_deserialization() {
        let json = r#"{
            "status": "succeeded",
            "findings": [
                {"category": "Violence", "label": "Graphic Violence", "confidence": 88.5}
            ]
        }"#;
        let poll: ModerationPoll = serde_json::from_str(json).unwrap();
        assert_eq!(poll.status, ModerationJobStatus::Succeeded);
        assert_eq!(poll.findings.len(), 1);
        assert_eq!(poll.findings[0].category, "Violence");
    }

    #[test]
    fn test_poll_defaults() {
        let json = r#"{"status": "in_progress"}"#;
        let poll: ModerationPoll = serde_json::from_str(json).unwrap();
        assert_eq!(poll.status, ModerationJobStatus::InProgress);
        assert!(poll.findings.is_empty());
        assert!(poll.status_message.is_none());
    }
}
