//! Progress event delivery.
//!
//! Events are advisory. Delivery failures are logged and dropped so a
//! realtime outage never stalls or fails a run.

use std::sync::Arc;

use tracing::debug;

use vsense_models::ProcessingEvent;
use vsense_realtime::RealtimeChannel;

/// Sends per-user processing events, best effort.
pub struct ProgressNotifier {
    channel: Arc<dyn RealtimeChannel>,
}

impl ProgressNotifier {
    pub fn new(channel: Arc<dyn RealtimeChannel>) -> Self {
        Self { channel }
    }

    /// Deliver an event to the asset owner's channel.
    pub async fn notify(&self, owner_id: &str, event: &ProcessingEvent) {
        if let Err(e) = self.channel.send_to_user(owner_id, event).await {
            debug!(
                owner_id,
                event = event.event_name(),
                error = %e,
                "Dropping undeliverable progress event"
            );
        }
    }
}
