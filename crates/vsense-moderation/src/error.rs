//! Moderation client error types.

use thiserror::Error;

/// Result type for moderation operations.
pub type ModerationResult<T> = Result<T, ModerationError>;

/// Errors raised by the moderation client.
///
/// All of these are absorbed by the moderation stage: the pipeline
/// degrades to empty findings rather than failing the run.
#[derive(Debug, Error)]
pub enum ModerationError {
    #[error("Failed to configure moderation client: {0}")]
    ConfigError(String),

    #[error("Job submission failed: {0}")]
    SubmitFailed(String),

    #[error("Job polling failed: {0}")]
    PollFailed(String),

    #[error("Moderation job failed: {0}")]
    JobFailed(String),

    #[error("Moderation job timed out after {attempts} polling attempts")]
    Timeout { attempts: u32 },
}

impl ModerationError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn submit_failed(msg: impl Into<String>) -> Self {
        Self::SubmitFailed(msg.into())
    }

    pub fn poll_failed(msg: impl Into<String>) -> Self {
        Self::PollFailed(msg.into())
    }

    pub fn job_failed(msg: impl Into<String>) -> Self {
        Self::JobFailed(msg.into())
    }
}
