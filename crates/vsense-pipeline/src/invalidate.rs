//! Cache invalidation.
//!
//! Every durable record write is followed by an invalidation of the
//! per-video cache entries, so readers can never observe a cached state
//! older than the stored one. Owner list views are only evicted on
//! terminal transitions; intermediate progress writes leave them alone.

use std::sync::Arc;

use tracing::debug;

use vsense_cache::{keys, Cache};
use vsense_models::VideoId;

/// Evicts cached views after record writes.
pub struct CacheInvalidator {
    cache: Arc<dyn Cache>,
}

impl CacheInvalidator {
    pub fn new(cache: Arc<dyn Cache>) -> Self {
        Self { cache }
    }

    /// Drop the per-video detail and stream entries.
    pub async fn invalidate(&self, video_id: &VideoId) {
        let full = self.cache.delete(&keys::video_key(video_id.as_str())).await;
        let stream = self
            .cache
            .delete(&keys::video_stream_key(video_id.as_str()))
            .await;
        debug!(%video_id, full, stream, "Invalidated video cache entries");
    }

    /// Drop the owner's list views and stats entry.
    pub async fn invalidate_owner_views(&self, owner_id: &str) {
        let lists = self
            .cache
            .delete_pattern(&keys::video_list_pattern(owner_id))
            .await;
        self.cache.delete(&keys::video_stats_key(owner_id)).await;
        debug!(owner_id, lists, "Invalidated owner list views");
    }
}
