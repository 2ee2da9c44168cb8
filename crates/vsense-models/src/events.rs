//! Realtime event payloads.
//!
//! Wire names and field casing match what the client session listens
//! for; delivery itself is a collaborator concern.

use serde::{Deserialize, Serialize};

use crate::sensitivity::{SensitivityResult, SensitivityStatus};
use crate::video::{Resolution, VideoId};

/// Event emitted to the owning user's live session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum ProcessingEvent {
    /// A run has started
    #[serde(rename = "video:processing:start")]
    Start {
        #[serde(rename = "videoId")]
        video_id: VideoId,
        title: String,
        message: String,
    },

    /// Stage/percentage update
    #[serde(rename = "video:processing:progress")]
    Progress {
        #[serde(rename = "videoId")]
        video_id: VideoId,
        stage: String,
        progress: u8,
        message: String,
    },

    /// Run finished with a verdict
    #[serde(rename = "video:processing:complete")]
    Complete {
        #[serde(rename = "videoId")]
        video_id: VideoId,
        status: SensitivityStatus,
        confidence: f64,
        reasons: Vec<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        duration: Option<u32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        resolution: Option<Resolution>,
    },

    /// Run terminated with an error
    #[serde(rename = "video:processing:error")]
    Error {
        #[serde(rename = "videoId")]
        video_id: VideoId,
        error: String,
    },
}

impl ProcessingEvent {
    /// Create a start event.
    pub fn start(video_id: VideoId, title: impl Into<String>) -> Self {
        ProcessingEvent::Start {
            video_id,
            title: title.into(),
            message: "Processing started".to_string(),
        }
    }

    /// Create a progress event.
    pub fn progress(
        video_id: VideoId,
        stage: impl Into<String>,
        progress: u8,
        message: impl Into<String>,
    ) -> Self {
        ProcessingEvent::Progress {
            video_id,
            stage: stage.into(),
            progress: progress.min(100),
            message: message.into(),
        }
    }

    /// Create a completion event carrying the full result payload.
    pub fn complete(
        video_id: VideoId,
        result: &SensitivityResult,
        duration: Option<u32>,
        resolution: Option<Resolution>,
    ) -> Self {
        ProcessingEvent::Complete {
            video_id,
            status: result.status,
            confidence: result.confidence,
            reasons: result.reasons.clone(),
            duration,
            resolution,
        }
    }

    /// Create an error event with a short message.
    pub fn error(video_id: VideoId, error: impl Into<String>) -> Self {
        ProcessingEvent::Error {
            video_id,
            error: error.into(),
        }
    }

    /// The wire event name.
    pub fn event_name(&self) -> &'static str {
        match self {
            ProcessingEvent::Start { .. } => "video:processing:start",
            ProcessingEvent::Progress { .. } => "video:processing:progress",
            ProcessingEvent::Complete { .. } => "video:processing:complete",
            ProcessingEvent::Error { .. } => "video:processing:error",
        }
    }

    /// The video this event concerns.
    pub fn video_id(&self) -> &VideoId {
        match self {
            ProcessingEvent::Start { video_id, .. }
            | ProcessingEvent::Progress { video_id, .. }
            | ProcessingEvent::Complete { video_id, .. }
            | ProcessingEvent::Error { video_id, .. } => video_id,
        }
    }
}
