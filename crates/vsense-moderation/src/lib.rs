//! External content-moderation service client.
//!
//! Submits a moderation job referencing an asset by its storage key,
//! polls on a fixed interval up to a configured attempt budget, and
//! surfaces findings or a typed error. A service outage never fails the
//! pipeline run: the moderation stage absorbs every error raised here
//! and degrades to empty findings.

pub mod client;
pub mod error;
pub mod metrics;
pub mod service;

pub use client::{
    ModerationClient, ModerationConfig, PollObserver, MODERATION_PROGRESS_END,
    MODERATION_PROGRESS_START, MODERATION_PROGRESS_SUBMITTED,
};
pub use error::{ModerationError, ModerationResult};
pub use service::{HttpModerationService, ModerationJobStatus, ModerationPoll, ModerationService};
