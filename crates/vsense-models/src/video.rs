//! Video record models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::sensitivity::SensitivityResult;

/// Unique identifier for a video asset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoId(pub String);

impl VideoId {
    /// Generate a new random video ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for VideoId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for VideoId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for VideoId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Where the asset bytes live.
///
/// A closed set of providers; the pipeline branches on capability,
/// never on string tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "snake_case")]
pub enum StorageRef {
    /// Asset on local disk.
    Local { path: String },
    /// Asset in the remote object store, addressed by key.
    Remote { key: String },
}

impl StorageRef {
    /// Whether the external moderation service can analyze this asset in place.
    ///
    /// Only remote objects can be handed to the service by key; local
    /// assets fall through to the heuristic path.
    pub fn supports_remote_analysis(&self) -> bool {
        matches!(self, StorageRef::Remote { .. })
    }

    /// Remote object key, if any.
    pub fn remote_key(&self) -> Option<&str> {
        match self {
            StorageRef::Remote { key } => Some(key),
            StorageRef::Local { .. } => None,
        }
    }
}

/// Video processing status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    /// Waiting for a run to start
    #[default]
    Pending,
    /// A run is in flight
    Processing,
    /// Run finished with a sensitivity result
    Completed,
    /// Run terminated with an error
    Failed,
}

impl ProcessingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingStatus::Pending => "pending",
            ProcessingStatus::Processing => "processing",
            ProcessingStatus::Completed => "completed",
            ProcessingStatus::Failed => "failed",
        }
    }

    /// Terminal states require an explicit reprocess to leave.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProcessingStatus::Completed | ProcessingStatus::Failed
        )
    }
}

impl fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Video resolution in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// The persisted job/video record.
///
/// The orchestrator is the only writer while a run is active. All
/// processing fields are reset wholesale by a reprocess, never patched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoRecord {
    /// Unique video ID
    pub id: VideoId,

    /// Owner (receives progress events); immutable
    pub owner_id: String,

    /// Display title
    pub title: String,

    /// Original uploaded filename
    pub original_name: String,

    /// File size in bytes
    pub size_bytes: u64,

    /// Asset location; immutable after creation
    pub storage: StorageRef,

    /// Processing status
    #[serde(default)]
    pub processing_status: ProcessingStatus,

    /// Progress 0-100, monotonically non-decreasing within a run
    #[serde(default)]
    pub processing_progress: u8,

    /// Label of the active stage, or None when not running
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_stage: Option<String>,

    /// Set only on successful completion
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sensitivity_result: Option<SensitivityResult>,

    /// Duration in seconds, set at most once per run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<u32>,

    /// Resolution, set at most once per run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<Resolution>,

    /// Timestamp of last successful completion
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<DateTime<Utc>>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,

    /// Advisory run token. Each run bumps it; a run whose generation is
    /// no longer current must stop writing.
    #[serde(default)]
    pub run_generation: u64,
}

impl VideoRecord {
    /// Create a new record in `pending` state.
    pub fn new(
        id: VideoId,
        owner_id: impl Into<String>,
        title: impl Into<String>,
        original_name: impl Into<String>,
        size_bytes: u64,
        storage: StorageRef,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            owner_id: owner_id.into(),
            title: title.into(),
            original_name: original_name.into(),
            size_bytes,
            storage,
            processing_status: ProcessingStatus::Pending,
            processing_progress: 0,
            current_stage: None,
            sensitivity_result: None,
            duration_secs: None,
            resolution: None,
            processed_at: None,
            created_at: now,
            updated_at: now,
            run_generation: 0,
        }
    }

    /// Reset processing fields ahead of a reprocess.
    ///
    /// Leaves metadata (duration/resolution) in place; a fresh run may
    /// overwrite it but never with nulls.
    pub fn reset_for_reprocess(&mut self) {
        self.processing_status = ProcessingStatus::Pending;
        self.processing_progress = 0;
        self.current_stage = None;
        self.sensitivity_result = None;
        self.processed_at = None;
        self.updated_at = Utc::now();
    }

    /// Claim the record for a new run: bump the generation and move to
    /// `processing` at zero progress.
    pub fn begin_run(&mut self) -> u64 {
        self.run_generation += 1;
        self.processing_status = ProcessingStatus::Processing;
        self.processing_progress = 0;
        self.sensitivity_result = None;
        self.processed_at = None;
        self.current_stage = None;
        self.updated_at = Utc::now();
        self.run_generation
    }

    /// Advance progress; never moves backwards within a run.
    pub fn set_progress(&mut self, progress: u8) {
        self.processing_progress = self.processing_progress.max(progress.min(100));
        self.updated_at = Utc::now();
    }

    /// Record metadata from the probe. Never overwrites with nothing.
    pub fn set_metadata(&mut self, duration_secs: Option<u32>, resolution: Option<Resolution>) {
        if duration_secs.is_some() {
            self.duration_secs = duration_secs;
        }
        if resolution.is_some() {
            self.resolution = resolution;
        }
        self.updated_at = Utc::now();
    }

    /// Mark as completed with the given result.
    pub fn complete(&mut self, result: SensitivityResult) {
        self.processing_status = ProcessingStatus::Completed;
        self.processing_progress = 100;
        self.current_stage = None;
        self.sensitivity_result = Some(result);
        self.processed_at = Some(Utc::now());
        self.updated_at = Utc::now();
    }

    /// Mark as failed. Partial progress is deliberately left in place;
    /// the terminal status is authoritative over stale progress.
    pub fn fail(&mut self) {
        self.processing_status = ProcessingStatus::Failed;
        self.current_stage = Some("Failed".to_string());
        self.updated_at = Utc::now();
    }
}
