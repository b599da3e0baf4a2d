//! # Message Subscriber
//!
//! Defines the subscription side of the bus.

use crate::topics::{BusMessage, MessageFilter};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, warn};

/// Errors from subscription operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// The bus was closed.
    #[error("Message bus closed")]
    Closed,
}

/// A live subscription as the bus sees it.
pub(crate) struct Registered {
    pub(crate) filter: MessageFilter,
    /// Bounded queue for work topics.
    pub(crate) queue: mpsc::Sender<BusMessage>,
}

pub(crate) type Registry = Arc<RwLock<HashMap<u64, Registered>>>;

/// Deregisters a subscription when dropped.
struct Registration {
    subscriptions: Registry,
    id: u64,
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.subscriptions.write().remove(&self.id);
        debug!(subscription = self.id, "Subscription dropped");
    }
}

/// A subscription handle for receiving messages.
///
/// Work topics arrive through a bounded per-subscription queue and are never
/// dropped; other topics come from the shared broadcast channel, where a
/// subscriber that falls more than the channel capacity behind skips the
/// oldest messages (logged and counted in `lagged()`).
///
/// When dropped, the subscription is automatically cleaned up.
pub struct Subscription {
    /// The broadcast receiver.
    receiver: broadcast::Receiver<BusMessage>,

    /// Work-topic queue.
    queue: mpsc::Receiver<BusMessage>,

    /// Filter for this subscription.
    filter: MessageFilter,

    /// Broadcast messages skipped so far.
    lagged: u64,

    registration: Registration,
}

impl Subscription {
    pub(crate) fn new(
        receiver: broadcast::Receiver<BusMessage>,
        queue: mpsc::Receiver<BusMessage>,
        filter: MessageFilter,
        subscriptions: Registry,
        id: u64,
    ) -> Self {
        Self {
            receiver,
            queue,
            filter,
            lagged: 0,
            registration: Registration { subscriptions, id },
        }
    }

    /// Receive the next message that matches the filter.
    ///
    /// Queued work-topic messages are preferred over broadcast ones.
    ///
    /// # Returns
    ///
    /// - `Some(message)` - The next matching message
    /// - `None` - The channel was closed (bus dropped)
    pub async fn recv(&mut self) -> Option<BusMessage> {
        loop {
            let message = tokio::select! {
                biased;
                Some(message) = self.queue.recv() => return Some(message),
                received = self.receiver.recv() => received,
            };

            match message {
                Ok(message) if self.filter.matches(&message) => return Some(message),
                Ok(_) => {}
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(count)) => self.record_lag(count),
            }
        }
    }

    /// Try to receive the next message without blocking.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(message))` - A message was available and matched
    /// - `Ok(None)` - No message available
    /// - `Err(SubscriptionError::Closed)` - The channel was closed
    pub fn try_recv(&mut self) -> Result<Option<BusMessage>, SubscriptionError> {
        if let Ok(message) = self.queue.try_recv() {
            return Ok(Some(message));
        }
        loop {
            let message = match self.receiver.try_recv() {
                Ok(m) => m,
                Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                Err(broadcast::error::TryRecvError::Closed) => {
                    return Err(SubscriptionError::Closed)
                }
                Err(broadcast::error::TryRecvError::Lagged(count)) => {
                    self.record_lag(count);
                    continue;
                }
            };

            if self.filter.matches(&message) {
                return Ok(Some(message));
            }
        }
    }

    fn record_lag(&mut self, count: u64) {
        self.lagged += count;
        warn!(
            subscription = self.registration.id,
            topics = ?self.filter.topics,
            skipped = count,
            total_skipped = self.lagged,
            "Subscriber lagged, broadcast messages dropped"
        );
    }

    /// Broadcast messages this subscription skipped because it lagged.
    #[must_use]
    pub fn lagged(&self) -> u64 {
        self.lagged
    }

    /// Get the filter for this subscription.
    #[must_use]
    pub fn filter(&self) -> &MessageFilter {
        &self.filter
    }

    /// Get the subscription id.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.registration.id
    }
}
