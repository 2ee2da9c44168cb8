//! Pipeline errors.

use thiserror::Error;

use vsense_models::VideoId;

use crate::store::StoreError;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Errors from pipeline orchestration.
///
/// Only record-store failures are fatal to a run. Cache, realtime, and
/// moderation failures are absorbed where they occur.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Video not found: {0}")]
    NotFound(VideoId),

    #[error("Run superseded for video {video_id} (generation {generation})")]
    Superseded { video_id: VideoId, generation: u64 },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl PipelineError {
    pub fn is_superseded(&self) -> bool {
        matches!(self, PipelineError::Superseded { .. })
    }
}
