//! Video sensitivity-analysis pipeline.
//!
//! Orchestrates per-video analysis runs: staged progress with durable
//! persistence and cache invalidation at every step, live per-user
//! progress events, external content moderation with a keyword and
//! heuristic fallback, and a final safe/flagged verdict.

pub mod classify;
pub mod config;
pub mod error;
pub mod invalidate;
pub mod metrics;
pub mod notify;
pub mod probe;
pub mod random;
pub mod run;
pub mod store;
pub mod trigger;

pub use classify::{Classifier, ClassifierConfig};
pub use config::PipelineConfig;
pub use error::{PipelineError, PipelineResult};
pub use invalidate::CacheInvalidator;
pub use notify::ProgressNotifier;
pub use probe::{MetadataProbe, VideoProbe};
pub use random::{FixedRandom, RandomSource, ThreadRandom};
pub use run::Pipeline;
pub use store::{MemoryVideoStore, RedisVideoStore, StoreError, VideoStore};
pub use trigger::{AnalyzeRequest, TriggerListener, TRIGGER_CHANNEL};
