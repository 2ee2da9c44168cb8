//! Sensitivity-analysis worker binary.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vsense_cache::RedisCache;
use vsense_moderation::{HttpModerationService, ModerationClient, ModerationConfig};
use vsense_pipeline::{
    CacheInvalidator, Classifier, ClassifierConfig, MetadataProbe, Pipeline, PipelineConfig,
    ProgressNotifier, RedisVideoStore, ThreadRandom, TriggerListener,
};
use vsense_realtime::RedisRealtimeChannel;
use vsense_storage::{S3Client, S3Config};

#[tokio::main]
async fn main() {
    // Install rustls crypto provider (required for TLS/HTTPS)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter =
        EnvFilter::from_default_env().add_directive("vsense=info".parse().unwrap());

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    info!("Starting vsense-pipeline");

    let s3_config = match S3Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("Storage configuration error: {}", e);
            std::process::exit(1);
        }
    };
    let blob = match S3Client::new(s3_config).await {
        Ok(c) => Arc::new(c),
        Err(e) => {
            error!("Failed to create storage client: {}", e);
            std::process::exit(1);
        }
    };

    let moderation_config = match ModerationConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("Moderation configuration error: {}", e);
            std::process::exit(1);
        }
    };
    let moderation_service = Arc::new(HttpModerationService::new(&moderation_config));
    let moderation = ModerationClient::new(moderation_service, moderation_config);

    let store = match RedisVideoStore::from_env() {
        Ok(s) => Arc::new(s),
        Err(e) => {
            error!("Failed to create record store: {}", e);
            std::process::exit(1);
        }
    };

    let channel = match RedisRealtimeChannel::from_env() {
        Ok(c) => Arc::new(c),
        Err(e) => {
            error!("Failed to create realtime channel: {}", e);
            std::process::exit(1);
        }
    };

    let cache = Arc::new(RedisCache::from_env());
    let random = Arc::new(ThreadRandom);

    let pipeline = Arc::new(Pipeline::new(
        store,
        ProgressNotifier::new(channel),
        CacheInvalidator::new(cache),
        moderation,
        MetadataProbe::new(blob, random.clone()),
        Classifier::new(ClassifierConfig::default(), random),
        PipelineConfig::from_env(),
    ));

    let listener = match TriggerListener::from_env(pipeline) {
        Ok(l) => l,
        Err(e) => {
            error!("Failed to create trigger listener: {}", e);
            std::process::exit(1);
        }
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received shutdown signal");
        shutdown_tx.send(true).ok();
    });

    if let Err(e) = listener.run(shutdown_rx).await {
        error!("Trigger listener error: {}", e);
        std::process::exit(1);
    }

    info!("Worker shutdown complete");
}
