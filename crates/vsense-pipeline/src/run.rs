//! Pipeline orchestrator.
//!
//! Drives one video through the staged state machine: validation
//! (0-20%), metadata (20-40%), moderation (40-80%), reporting (80-95%),
//! finalization (100%). The orchestrator is the sole writer of the
//! record's processing fields during a run; every durable write is
//! followed by cache invalidation before the next observable change.
//!
//! Only record-store failures are fatal to a run. Moderation and probe
//! failures are absorbed with fallbacks, and a run whose generation has
//! been superseded by a reprocess stops writing and aborts quietly.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use vsense_models::{ProcessingEvent, SensitivityResult, VideoId, VideoRecord};
use vsense_moderation::{ModerationClient, PollObserver, MODERATION_PROGRESS_END};

use crate::classify::Classifier;
use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::invalidate::CacheInvalidator;
use crate::metrics::{record_run, record_run_duration};
use crate::notify::ProgressNotifier;
use crate::probe::MetadataProbe;
use crate::store::VideoStore;

/// The analysis pipeline.
pub struct Pipeline {
    store: Arc<dyn VideoStore>,
    notifier: ProgressNotifier,
    invalidator: CacheInvalidator,
    moderation: ModerationClient,
    probe: MetadataProbe,
    classifier: Classifier,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(
        store: Arc<dyn VideoStore>,
        notifier: ProgressNotifier,
        invalidator: CacheInvalidator,
        moderation: ModerationClient,
        probe: MetadataProbe,
        classifier: Classifier,
        config: PipelineConfig,
    ) -> Self {
        Self {
            store,
            notifier,
            invalidator,
            moderation,
            probe,
            classifier,
            config,
        }
    }

    /// Start a run fire-and-forget.
    ///
    /// Fails with `NotFound` (and emits nothing) when the record does
    /// not exist; otherwise the staged run proceeds on its own task.
    pub async fn start_run(self: &Arc<Self>, video_id: &VideoId) -> PipelineResult<()> {
        if self.store.get(video_id).await?.is_none() {
            return Err(PipelineError::NotFound(video_id.clone()));
        }

        let pipeline = Arc::clone(self);
        let video_id = video_id.clone();
        tokio::spawn(async move {
            if let Err(e) = pipeline.run_to_completion(&video_id).await {
                if e.is_superseded() {
                    debug!(%video_id, "Run aborted: {}", e);
                } else {
                    error!(%video_id, "Run failed: {}", e);
                }
            }
        });

        Ok(())
    }

    /// Reset a finished record and start a fresh run.
    ///
    /// The reset and the run are separate writes; a crash between them
    /// leaves the record pending, recoverable by another reprocess.
    pub async fn reprocess(self: &Arc<Self>, video_id: &VideoId) -> PipelineResult<()> {
        let mut record = self
            .store
            .get(video_id)
            .await?
            .ok_or_else(|| PipelineError::NotFound(video_id.clone()))?;

        info!(%video_id, "Reprocessing video");
        record.reset_for_reprocess();
        self.store.put(&record).await?;
        self.invalidator.invalidate(video_id).await;
        self.invalidator
            .invalidate_owner_views(&record.owner_id)
            .await;

        self.start_run(video_id).await
    }

    /// Run the full stage sequence to a terminal state.
    pub async fn run_to_completion(
        &self,
        video_id: &VideoId,
    ) -> PipelineResult<SensitivityResult> {
        let started = Instant::now();

        let mut record = self
            .store
            .get(video_id)
            .await?
            .ok_or_else(|| PipelineError::NotFound(video_id.clone()))?;

        record.begin_run();
        self.guarded_save(&record).await?;
        self.invalidator.invalidate(video_id).await;
        self.notifier
            .notify(
                &record.owner_id,
                &ProcessingEvent::start(video_id.clone(), record.title.clone()),
            )
            .await;

        info!(%video_id, generation = record.run_generation, "Analysis run started");

        match self.execute_stages(&mut record).await {
            Ok(result) => {
                record_run("completed");
                record_run_duration(started.elapsed());
                info!(
                    %video_id,
                    status = %result.status,
                    confidence = result.confidence,
                    "Analysis run completed"
                );
                Ok(result)
            }
            Err(e) if e.is_superseded() => {
                debug!(%video_id, "Stopping superseded run without a terminal write");
                Err(e)
            }
            Err(e) => {
                warn!(%video_id, "Analysis run failed: {}", e);
                self.write_failure(&record).await;
                self.notifier
                    .notify(
                        &record.owner_id,
                        &ProcessingEvent::error(video_id.clone(), e.to_string()),
                    )
                    .await;
                record_run("failed");
                record_run_duration(started.elapsed());
                Err(e)
            }
        }
    }

    async fn execute_stages(
        &self,
        record: &mut VideoRecord,
    ) -> PipelineResult<SensitivityResult> {
        self.paced_stage(
            record,
            "Validating file integrity",
            0,
            20,
            self.config.validation_duration,
        )
        .await?;

        self.metadata_stage(record).await?;

        let findings = self.moderation_stage(record).await?;

        self.paced_stage(
            record,
            "Generating sensitivity report",
            80,
            95,
            self.config.reporting_duration,
        )
        .await?;

        // Finalization
        let result = self.classifier.classify(
            &record.original_name,
            &record.title,
            record.size_bytes,
            &findings,
        );

        record.complete(result.clone());
        self.guarded_save(record).await?;
        self.invalidator.invalidate(&record.id).await;
        self.invalidator
            .invalidate_owner_views(&record.owner_id)
            .await;
        self.notifier
            .notify(
                &record.owner_id,
                &ProcessingEvent::complete(
                    record.id.clone(),
                    &result,
                    record.duration_secs,
                    record.resolution,
                ),
            )
            .await;

        Ok(result)
    }

    /// Metadata stage (20-40%): probe the asset, tolerate any failure.
    async fn metadata_stage(&self, record: &mut VideoRecord) -> PipelineResult<()> {
        if record.storage.supports_remote_analysis() {
            self.checkpoint(
                record,
                "Downloading video for analysis",
                22,
                "Downloading from cloud storage...",
            )
            .await?;
        }
        self.checkpoint(
            record,
            "Extracting video metadata",
            25,
            "Reading video information...",
        )
        .await?;

        let probe = self.probe.probe(&record.storage, &record.original_name).await;
        tokio::time::sleep(self.config.metadata_settle_delay).await;

        record.set_metadata(Some(probe.duration_secs), Some(probe.resolution));
        record.set_progress(40);
        self.guarded_save(record).await?;
        self.invalidator.invalidate(&record.id).await;

        Ok(())
    }

    /// Moderation stage (40-80%). Never raises for moderation-service
    /// trouble: errors degrade to empty findings after a simulated
    /// advance, so the classifier's fallback path activates.
    async fn moderation_stage(
        &self,
        record: &mut VideoRecord,
    ) -> PipelineResult<Vec<vsense_models::ModerationFinding>> {
        if !record.storage.supports_remote_analysis() {
            self.paced_stage(
                record,
                "Analyzing video frames for content",
                40,
                MODERATION_PROGRESS_END,
                self.config.moderation_sim_duration,
            )
            .await?;
            return Ok(Vec::new());
        }

        self.checkpoint(
            record,
            "Starting content moderation analysis",
            40,
            "Initiating content moderation analysis...",
        )
        .await?;

        let observer = StageObserver {
            pipeline: self,
            video_id: record.id.clone(),
            owner_id: record.owner_id.clone(),
            generation: record.run_generation,
        };

        let outcome = self.moderation.analyze(&record.storage, &observer).await;

        // The observer wrote through the store; pick its writes up
        // before continuing, and notice a supersede while we are at it.
        self.reload(record).await?;

        match outcome {
            Ok(findings) => Ok(findings),
            Err(e) => {
                warn!(video_id = %record.id, "Moderation unavailable, using fallback: {}", e);
                let from = record.processing_progress.max(40);
                self.paced_stage(
                    record,
                    "Analyzing video frames (fallback)",
                    from,
                    MODERATION_PROGRESS_END,
                    self.config.moderation_fallback_duration,
                )
                .await?;
                Ok(Vec::new())
            }
        }
    }

    /// Advance a cosmetic stage in fixed sub-steps, persisting, fanning
    /// out, and invalidating at each step.
    async fn paced_stage(
        &self,
        record: &mut VideoRecord,
        stage: &str,
        start: u8,
        end: u8,
        duration: std::time::Duration,
    ) -> PipelineResult<()> {
        let steps = self.config.stage_steps.max(1);
        let step_delay = duration / steps;
        let increment = (end - start) as f64 / steps as f64;

        record.current_stage = Some(stage.to_string());

        for i in 0..=steps {
            let progress = (start as f64 + increment * i as f64).round() as u8;
            record.set_progress(progress);
            self.guarded_save(record).await?;
            self.invalidator.invalidate(&record.id).await;
            self.notifier
                .notify(
                    &record.owner_id,
                    &ProcessingEvent::progress(
                        record.id.clone(),
                        stage,
                        progress,
                        format!("{}... {}%", stage, progress),
                    ),
                )
                .await;

            if i < steps {
                tokio::time::sleep(step_delay).await;
            }
        }

        Ok(())
    }

    /// Single persisted progress checkpoint with its own event.
    async fn checkpoint(
        &self,
        record: &mut VideoRecord,
        stage: &str,
        progress: u8,
        message: &str,
    ) -> PipelineResult<()> {
        record.current_stage = Some(stage.to_string());
        record.set_progress(progress);
        self.guarded_save(record).await?;
        self.invalidator.invalidate(&record.id).await;
        self.notifier
            .notify(
                &record.owner_id,
                &ProcessingEvent::progress(record.id.clone(), stage, progress, message),
            )
            .await;
        Ok(())
    }

    /// Persist the record unless a newer run has claimed it.
    async fn guarded_save(&self, record: &VideoRecord) -> PipelineResult<()> {
        if let Some(current) = self.store.get(&record.id).await? {
            if current.run_generation > record.run_generation {
                return Err(PipelineError::Superseded {
                    video_id: record.id.clone(),
                    generation: record.run_generation,
                });
            }
        }
        self.store.put(record).await?;
        Ok(())
    }

    /// Refresh the in-memory record from the store, aborting if a newer
    /// run has claimed it.
    async fn reload(&self, record: &mut VideoRecord) -> PipelineResult<()> {
        if let Some(latest) = self.store.get(&record.id).await? {
            if latest.run_generation > record.run_generation {
                return Err(PipelineError::Superseded {
                    video_id: record.id.clone(),
                    generation: record.run_generation,
                });
            }
            *record = latest;
        }
        Ok(())
    }

    /// Terminal failure write. Best effort: the store may be the thing
    /// that is broken.
    async fn write_failure(&self, record: &VideoRecord) {
        let mut failed = record.clone();
        failed.fail();
        if let Err(e) = self.store.put(&failed).await {
            error!(video_id = %record.id, "Could not persist failed status: {}", e);
        }
        self.invalidator.invalidate(&record.id).await;
        self.invalidator
            .invalidate_owner_views(&record.owner_id)
            .await;
    }

    /// Observer-side progress write for the moderation polling loop.
    async fn observer_checkpoint(
        &self,
        video_id: &VideoId,
        owner_id: &str,
        generation: u64,
        progress: u8,
        message: &str,
    ) -> PipelineResult<()> {
        let Some(mut record) = self.store.get(video_id).await? else {
            return Ok(());
        };
        if record.run_generation > generation {
            debug!(%video_id, "Skipping poll update for superseded run");
            return Ok(());
        }

        let stage = moderation_stage_label(progress);
        record.current_stage = Some(stage.to_string());
        record.set_progress(progress);
        self.store.put(&record).await?;
        self.invalidator.invalidate(video_id).await;
        self.notifier
            .notify(
                owner_id,
                &ProcessingEvent::progress(video_id.clone(), stage, progress, message),
            )
            .await;
        Ok(())
    }
}

/// Stage label shown while the external moderation job runs.
fn moderation_stage_label(progress: u8) -> &'static str {
    match progress {
        50 => "Content moderation processing",
        MODERATION_PROGRESS_END => "Content analysis complete",
        _ => "Analyzing video content",
    }
}

/// Bridges the moderation polling loop back into orchestrator
/// bookkeeping. Write failures here are logged and dropped; the polling
/// loop must not die because a progress write did.
struct StageObserver<'a> {
    pipeline: &'a Pipeline,
    video_id: VideoId,
    owner_id: String,
    generation: u64,
}

#[async_trait]
impl PollObserver for StageObserver<'_> {
    async fn on_progress(&self, progress: u8, message: &str) {
        if let Err(e) = self
            .pipeline
            .observer_checkpoint(&self.video_id, &self.owner_id, self.generation, progress, message)
            .await
        {
            debug!(video_id = %self.video_id, "Dropping poll progress update: {}", e);
        }
    }
}
