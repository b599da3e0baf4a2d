//! Inbound ack listener.
//!
//! Consumes `Topic::EbxmlAck` and completes the matching exchange waiter.
//! An ack is dropped when:
//! - its transport message id was already seen (broker redelivery)
//! - it carries no correlation id
//! - its correlation id is not in progress (late ack for a finished
//!   exchange)

use crate::domain::PendingAckStore;
use parking_lot::Mutex;
use shared_bus::{BusMessage, Subscription, TimeBoundedSeenCache};
use shared_types::KeyStore;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What happened to one ack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckDisposition {
    Completed,
    Duplicate,
    Uncorrelated,
    NotInProgress,
    NoWaiter,
}

pub struct AckListener {
    in_progress: Arc<dyn KeyStore>,
    pending: Arc<PendingAckStore>,
    seen: Mutex<TimeBoundedSeenCache>,
}

impl AckListener {
    pub fn new(in_progress: Arc<dyn KeyStore>, pending: Arc<PendingAckStore>) -> Self {
        Self::with_seen_cache(in_progress, pending, TimeBoundedSeenCache::new())
    }

    pub fn with_seen_cache(
        in_progress: Arc<dyn KeyStore>,
        pending: Arc<PendingAckStore>,
        seen: TimeBoundedSeenCache,
    ) -> Self {
        Self {
            in_progress,
            pending,
            seen: Mutex::new(seen),
        }
    }

    /// Route one ack message.
    pub fn handle(&self, message: BusMessage) -> AckDisposition {
        if !self.seen.lock().first_sighting(message.message_id) {
            debug!(message_id = %message.message_id, "Dropping redelivered ack");
            return AckDisposition::Duplicate;
        }

        let Some(correlation_id) = message.correlation_id else {
            warn!(message_id = %message.message_id, "Ack without correlation id");
            return AckDisposition::Uncorrelated;
        };

        if !self.in_progress.contains(correlation_id.as_str()) {
            debug!(
                correlation_id = %correlation_id,
                "Ack for exchange that is not in progress"
            );
            return AckDisposition::NotInProgress;
        }

        if self.pending.complete(&correlation_id, message.body) {
            info!(
                event = "spine-multipart-message-ack-received",
                correlation_id = %correlation_id,
                "Ack matched"
            );
            AckDisposition::Completed
        } else {
            AckDisposition::NoWaiter
        }
    }

    /// Consume acks until the subscription closes.
    pub async fn run(&self, mut subscription: Subscription) {
        while let Some(message) = subscription.recv().await {
            self.handle(message);
        }
        debug!("Ack subscription closed");
    }
}
