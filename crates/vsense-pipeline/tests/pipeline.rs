//! End-to-end pipeline runs against in-memory collaborators.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use vsense_cache::Cache;
use vsense_models::{
    AnalysisMethod, ModerationFinding, ProcessingEvent, ProcessingStatus, SensitivityStatus,
    StorageRef, VideoId, VideoRecord,
};
use vsense_moderation::{
    ModerationClient, ModerationConfig, ModerationJobStatus, ModerationPoll, ModerationResult,
    ModerationService,
};
use vsense_pipeline::{
    CacheInvalidator, Classifier, ClassifierConfig, FixedRandom, MemoryVideoStore, MetadataProbe,
    Pipeline, PipelineConfig, ProgressNotifier, VideoStore,
};
use vsense_realtime::{RealtimeChannel, RealtimeResult};
use vsense_storage::{BlobStore, StorageError, StorageResult};

/// Channel fake that records every delivered event.
#[derive(Default)]
struct RecordingChannel {
    events: Mutex<Vec<(String, ProcessingEvent)>>,
}

impl RecordingChannel {
    fn events(&self) -> Vec<(String, ProcessingEvent)> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl RealtimeChannel for RecordingChannel {
    async fn send_to_user(&self, user_id: &str, event: &ProcessingEvent) -> RealtimeResult<()> {
        self.events
            .lock()
            .unwrap()
            .push((user_id.to_string(), event.clone()));
        Ok(())
    }
}

/// Cache fake that records every eviction.
#[derive(Default)]
struct CountingCache {
    deleted: Mutex<Vec<String>>,
}

impl CountingCache {
    fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl Cache for CountingCache {
    async fn get(&self, _key: &str) -> Option<String> {
        None
    }
    async fn set(&self, _key: &str, _value: &str, _ttl_secs: u64) -> bool {
        true
    }
    async fn exists(&self, _key: &str) -> bool {
        false
    }
    async fn delete(&self, key: &str) -> bool {
        self.deleted.lock().unwrap().push(key.to_string());
        true
    }
    async fn delete_pattern(&self, pattern: &str) -> u64 {
        self.deleted.lock().unwrap().push(pattern.to_string());
        1
    }
}

/// Blob store with no objects; forces the synthetic metadata path.
struct NoBlobs;

#[async_trait]
impl BlobStore for NoBlobs {
    async fn get(&self, key: &str) -> StorageResult<Vec<u8>> {
        Err(StorageError::not_found(key))
    }
    async fn put(&self, _data: Vec<u8>, _content_type: &str) -> StorageResult<String> {
        Err(StorageError::upload_failed("unavailable"))
    }
    async fn delete(&self, _key: &str) -> StorageResult<()> {
        Ok(())
    }
    async fn download_to_file(&self, key: &str, _path: &std::path::Path) -> StorageResult<()> {
        Err(StorageError::not_found(key))
    }
}

/// Scripted moderation service, returning queued polls in order.
struct ScriptedService {
    polls: Mutex<Vec<ModerationPoll>>,
    fail_submit: bool,
}

impl ScriptedService {
    fn with_polls(polls: Vec<ModerationPoll>) -> Self {
        Self {
            polls: Mutex::new(polls),
            fail_submit: false,
        }
    }

    fn broken() -> Self {
        Self {
            polls: Mutex::new(Vec::new()),
            fail_submit: true,
        }
    }
}

#[async_trait]
impl ModerationService for ScriptedService {
    async fn submit(&self, _asset_key: &str) -> ModerationResult<String> {
        if self.fail_submit {
            return Err(vsense_moderation::ModerationError::submit_failed(
                "service unreachable",
            ));
        }
        Ok("job-1".to_string())
    }

    async fn poll(&self, _job_handle: &str) -> ModerationResult<ModerationPoll> {
        let mut polls = self.polls.lock().unwrap();
        if polls.is_empty() {
            Ok(ModerationPoll {
                status: ModerationJobStatus::InProgress,
                status_message: None,
                findings: Vec::new(),
            })
        } else {
            Ok(polls.remove(0))
        }
    }
}

struct Harness {
    pipeline: Arc<Pipeline>,
    store: Arc<MemoryVideoStore>,
    channel: Arc<RecordingChannel>,
    cache: Arc<CountingCache>,
}

fn harness_with(store: Arc<dyn VideoStore>, service: ScriptedService) -> (Arc<Pipeline>, Arc<RecordingChannel>, Arc<CountingCache>) {
    let channel = Arc::new(RecordingChannel::default());
    let cache = Arc::new(CountingCache::default());
    let random = Arc::new(FixedRandom::never());

    let moderation_config = ModerationConfig {
        max_poll_attempts: 3,
        poll_interval: Duration::from_millis(1),
        submit_settle_delay: Duration::ZERO,
        ..ModerationConfig::default()
    };

    let pipeline = Arc::new(Pipeline::new(
        store,
        ProgressNotifier::new(channel.clone()),
        CacheInvalidator::new(cache.clone()),
        ModerationClient::new(Arc::new(service), moderation_config),
        MetadataProbe::new(Arc::new(NoBlobs), random.clone()),
        Classifier::new(ClassifierConfig::default(), random),
        PipelineConfig::instant(),
    ));

    (pipeline, channel, cache)
}

fn harness(service: ScriptedService) -> Harness {
    let store = Arc::new(MemoryVideoStore::new());
    let (pipeline, channel, cache) = harness_with(store.clone(), service);
    Harness {
        pipeline,
        store,
        channel,
        cache,
    }
}

fn local_record(name: &str, size_bytes: u64) -> VideoRecord {
    VideoRecord::new(
        VideoId::new(),
        "user-1",
        name.trim_end_matches(".mp4"),
        name,
        size_bytes,
        StorageRef::Local {
            path: format!("/srv/videos/{}", name),
        },
    )
}

fn remote_record(name: &str) -> VideoRecord {
    VideoRecord::new(
        VideoId::new(),
        "user-1",
        name.trim_end_matches(".mp4"),
        name,
        64 * 1024 * 1024,
        StorageRef::Remote {
            key: format!("uploads/{}", name),
        },
    )
}

#[tokio::test]
async fn test_keyword_flagged_run() {
    let h = harness(ScriptedService::with_polls(vec![]));
    let record = local_record("training_violence_demo.mp4", 1024);
    let id = record.id.clone();
    h.store.insert(record).await;

    let result = h.pipeline.run_to_completion(&id).await.unwrap();

    assert_eq!(result.status, SensitivityStatus::Flagged);
    assert_eq!(result.analysis_method, AnalysisMethod::HeuristicFallback);
    assert!(result
        .reasons
        .contains(&"Content may contain: violence".to_string()));

    let stored = h.store.get(&id).await.unwrap().unwrap();
    assert_eq!(stored.processing_status, ProcessingStatus::Completed);
    assert_eq!(stored.processing_progress, 100);
    assert!(stored.processed_at.is_some());
}

#[tokio::test]
async fn test_clean_run_is_safe_with_canned_reason() {
    let h = harness(ScriptedService::with_polls(vec![]));
    let record = local_record("team_standup.mp4", 10 * 1024 * 1024);
    let id = record.id.clone();
    h.store.insert(record).await;

    let result = h.pipeline.run_to_completion(&id).await.unwrap();

    assert_eq!(result.status, SensitivityStatus::Safe);
    assert_eq!(
        result.reasons,
        vec!["Content passed all safety checks".to_string()]
    );

    let stored = h.store.get(&id).await.unwrap().unwrap();
    // synthetic metadata was recorded during the run
    assert!(stored.duration_secs.is_some());
    assert!(stored.resolution.is_some());
}

#[tokio::test]
async fn test_moderation_findings_drive_verdict() {
    let h = harness(ScriptedService::with_polls(vec![ModerationPoll {
        status: ModerationJobStatus::Succeeded,
        status_message: None,
        findings: vec![
            ModerationFinding::new("Explicit Nudity", "Graphic Nudity", 91.2),
            ModerationFinding::new("Explicit Nudity", "Nudity", 76.0),
        ],
    }]));
    let record = remote_record("beach_day.mp4");
    let id = record.id.clone();
    h.store.insert(record).await;

    let result = h.pipeline.run_to_completion(&id).await.unwrap();

    assert_eq!(result.status, SensitivityStatus::Flagged);
    assert_eq!(result.analysis_method, AnalysisMethod::ExternalModeration);
    assert_eq!(result.confidence, 0.91);
    assert_eq!(
        result.reasons,
        vec!["Detected Explicit Nudity (Graphic Nudity, Nudity) - 91% confidence"]
    );
}

#[tokio::test]
async fn test_progress_is_monotone_and_stages_ordered() {
    let h = harness(ScriptedService::with_polls(vec![]));
    let record = local_record("quarterly_review.mp4", 2048);
    let id = record.id.clone();
    h.store.insert(record).await;

    h.pipeline.run_to_completion(&id).await.unwrap();

    let events = h.channel.events();
    assert!(matches!(events.first(), Some((_, ProcessingEvent::Start { .. }))));
    assert!(matches!(events.last(), Some((_, ProcessingEvent::Complete { .. }))));
    assert!(events.iter().all(|(user, _)| user == "user-1"));

    let progress: Vec<u8> = events
        .iter()
        .filter_map(|(_, e)| match e {
            ProcessingEvent::Progress { progress, .. } => Some(*progress),
            _ => None,
        })
        .collect();
    assert!(progress.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(progress.last(), Some(&95));

    let stages: Vec<String> = events
        .iter()
        .filter_map(|(_, e)| match e {
            ProcessingEvent::Progress { stage, .. } => Some(stage.clone()),
            _ => None,
        })
        .collect();
    let order = [
        "Validating file integrity",
        "Extracting video metadata",
        "Analyzing video frames for content",
        "Generating sensitivity report",
    ];
    let mut last_index = 0;
    for stage_name in order {
        let index = stages
            .iter()
            .position(|s| s == stage_name)
            .unwrap_or_else(|| panic!("stage {} never reported", stage_name));
        assert!(index >= last_index, "stage {} out of order", stage_name);
        last_index = index;
    }
}

#[tokio::test]
async fn test_moderation_outage_degrades_to_fallback() {
    let h = harness(ScriptedService::broken());
    let record = remote_record("family_picnic.mp4");
    let id = record.id.clone();
    h.store.insert(record).await;

    let result = h.pipeline.run_to_completion(&id).await.unwrap();

    assert_eq!(result.analysis_method, AnalysisMethod::HeuristicFallback);
    assert_eq!(result.status, SensitivityStatus::Safe);

    let stored = h.store.get(&id).await.unwrap().unwrap();
    assert_eq!(stored.processing_status, ProcessingStatus::Completed);
    assert_eq!(stored.processing_progress, 100);
}

#[tokio::test]
async fn test_moderation_timeout_degrades_to_fallback() {
    // Every poll reports in_progress; attempts exhaust, fallback runs.
    let h = harness(ScriptedService::with_polls(vec![]));
    let record = remote_record("lecture_recording.mp4");
    let id = record.id.clone();
    h.store.insert(record).await;

    let result = h.pipeline.run_to_completion(&id).await.unwrap();
    assert_eq!(result.analysis_method, AnalysisMethod::HeuristicFallback);

    let stored = h.store.get(&id).await.unwrap().unwrap();
    assert_eq!(stored.processing_status, ProcessingStatus::Completed);
}

#[tokio::test]
async fn test_missing_video_emits_nothing() {
    let h = harness(ScriptedService::with_polls(vec![]));

    let err = h.pipeline.start_run(&VideoId::new()).await.unwrap_err();
    assert!(matches!(err, vsense_pipeline::PipelineError::NotFound(_)));
    assert!(h.channel.events().is_empty());
    assert!(h.cache.deleted().is_empty());
}

#[tokio::test]
async fn test_every_stage_write_invalidates_video_cache() {
    let h = harness(ScriptedService::with_polls(vec![]));
    let record = local_record("all_hands.mp4", 4096);
    let id = record.id.clone();
    h.store.insert(record).await;

    h.pipeline.run_to_completion(&id).await.unwrap();

    let deleted = h.cache.deleted();
    let full_key = format!("video:{}:full", id);
    let progress_events = h
        .channel
        .events()
        .iter()
        .filter(|(_, e)| matches!(e, ProcessingEvent::Progress { .. }))
        .count();

    let full_evictions = deleted.iter().filter(|k| **k == full_key).count();
    assert!(
        full_evictions >= progress_events,
        "expected an eviction per progress write ({} < {})",
        full_evictions,
        progress_events
    );
    // terminal transition also drops the owner's list views
    assert!(deleted.iter().any(|k| k == "videos:list:user-1:*"));
    assert!(deleted.iter().any(|k| k == "videos:stats:user-1"));
}

/// Store wrapper that delegates a fixed number of writes, then fails
/// every further one.
struct FailingVideoStore {
    inner: Arc<MemoryVideoStore>,
    remaining_puts: Mutex<usize>,
}

impl FailingVideoStore {
    fn new(inner: Arc<MemoryVideoStore>, fail_after: usize) -> Self {
        Self {
            inner,
            remaining_puts: Mutex::new(fail_after),
        }
    }
}

#[async_trait]
impl VideoStore for FailingVideoStore {
    async fn get(
        &self,
        id: &VideoId,
    ) -> Result<Option<VideoRecord>, vsense_pipeline::StoreError> {
        self.inner.get(id).await
    }

    async fn put(&self, record: &VideoRecord) -> Result<(), vsense_pipeline::StoreError> {
        {
            let mut remaining = self.remaining_puts.lock().unwrap();
            if *remaining == 0 {
                return Err(vsense_pipeline::StoreError::Unavailable(
                    "record store down".to_string(),
                ));
            }
            *remaining -= 1;
        }
        self.inner.put(record).await
    }
}

#[tokio::test]
async fn test_store_outage_fails_run_with_error_event() {
    let inner = Arc::new(MemoryVideoStore::new());
    let record = local_record("board_meeting.mp4", 4096);
    let id = record.id.clone();
    inner.insert(record).await;

    let store = Arc::new(FailingVideoStore::new(inner, 2));
    let (pipeline, channel, _cache) =
        harness_with(store, ScriptedService::with_polls(vec![]));

    let err = pipeline.run_to_completion(&id).await.unwrap_err();
    assert!(!err.is_superseded());

    let events = channel.events();
    assert!(events
        .iter()
        .any(|(_, e)| matches!(e, ProcessingEvent::Error { .. })));
    assert!(!events
        .iter()
        .any(|(_, e)| matches!(e, ProcessingEvent::Complete { .. })));
}

/// Store wrapper that, after a fixed number of writes, lets a competing
/// run claim the record with a newer generation.
struct SupersedingStore {
    inner: Arc<MemoryVideoStore>,
    puts: Mutex<usize>,
    supersede_after: usize,
}

#[async_trait]
impl VideoStore for SupersedingStore {
    async fn get(
        &self,
        id: &VideoId,
    ) -> Result<Option<VideoRecord>, vsense_pipeline::StoreError> {
        self.inner.get(id).await
    }

    async fn put(&self, record: &VideoRecord) -> Result<(), vsense_pipeline::StoreError> {
        self.inner.put(record).await?;
        let claim = {
            let mut puts = self.puts.lock().unwrap();
            *puts += 1;
            *puts == self.supersede_after
        };
        if claim {
            let mut competing = record.clone();
            competing.run_generation += 1;
            self.inner.put(&competing).await?;
        }
        Ok(())
    }
}

#[tokio::test]
async fn test_superseded_run_stops_writing_quietly() {
    let inner = Arc::new(MemoryVideoStore::new());
    let record = local_record("archived_footage.mp4", 4096);
    let id = record.id.clone();
    inner.insert(record).await;

    let store = Arc::new(SupersedingStore {
        inner: inner.clone(),
        puts: Mutex::new(0),
        supersede_after: 3,
    });
    let (pipeline, channel, _cache) =
        harness_with(store, ScriptedService::with_polls(vec![]));

    let err = pipeline.run_to_completion(&id).await.unwrap_err();
    assert!(err.is_superseded());

    // The stale run wrote no terminal state and sent no error event.
    let stored = inner.get(&id).await.unwrap().unwrap();
    assert_ne!(stored.processing_status, ProcessingStatus::Completed);
    assert!(!channel
        .events()
        .iter()
        .any(|(_, e)| matches!(e, ProcessingEvent::Error { .. })));
    assert!(!channel
        .events()
        .iter()
        .any(|(_, e)| matches!(e, ProcessingEvent::Complete { .. })));
}

#[tokio::test]
async fn test_reprocess_resets_then_completes() {
    let h = harness(ScriptedService::with_polls(vec![]));
    let record = local_record("rerun_me.mp4", 4096);
    let id = record.id.clone();
    h.store.insert(record).await;

    let first = h.pipeline.run_to_completion(&id).await.unwrap();
    assert_eq!(first.status, SensitivityStatus::Safe);
    let generation_after_first = h.store.get(&id).await.unwrap().unwrap().run_generation;

    h.pipeline.reprocess(&id).await.unwrap();

    // The spawned run races this assertion; poll until terminal.
    let mut stored = h.store.get(&id).await.unwrap().unwrap();
    for _ in 0..200 {
        if stored.processing_status.is_terminal() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
        stored = h.store.get(&id).await.unwrap().unwrap();
    }

    assert_eq!(stored.processing_status, ProcessingStatus::Completed);
    assert!(stored.run_generation > generation_after_first);
    assert!(stored.sensitivity_result.is_some());
}
