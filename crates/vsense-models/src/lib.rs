//! Shared data models for the VSense backend.
//!
//! Everything that crosses a crate boundary lives here: video records,
//! sensitivity verdicts, moderation findings, and the realtime event
//! payloads delivered to clients.

pub mod events;
pub mod sensitivity;
pub mod video;

pub use events::ProcessingEvent;
pub use sensitivity::{
    round2, AnalysisMethod, ModerationFinding, SensitivityResult, SensitivityStatus,
};
pub use video::{ProcessingStatus, Resolution, StorageRef, VideoId, VideoRecord};
