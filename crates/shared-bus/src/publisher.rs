//! # Message Publisher
//!
//! Defines the publishing side of the bus.

use crate::subscriber::{Registered, Registry, Subscription};
use crate::topics::{BusMessage, MessageFilter, Topic};
use crate::DEFAULT_CHANNEL_CAPACITY;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, warn};

/// Errors from publish operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BusError {
    /// No subscriber selects the topic, the message was dropped.
    #[error("No subscribers for topic {topic:?}")]
    NoSubscribers { topic: Topic },
}

/// Trait for publishing messages to the bus.
#[async_trait]
pub trait MessagePublisher: Send + Sync {
    /// Publish a message.
    ///
    /// # Returns
    ///
    /// The number of subscriptions whose filter selects the message topic.
    ///
    /// # Errors
    ///
    /// `BusError::NoSubscribers` when no subscription selects the topic.
    async fn publish(&self, message: BusMessage) -> Result<usize, BusError>;

    /// Get the total number of messages published.
    fn messages_published(&self) -> u64;
}

/// In-memory implementation of the bus.
///
/// Uses `tokio::sync::broadcast` for notification topics and a bounded
/// `tokio::sync::mpsc` queue per subscription for work topics; a full work
/// queue makes its publishers wait. Suitable for a single node; a
/// broker-backed implementation would provide durable queues.
pub struct InMemoryMessageBus {
    /// Broadcast sender for messages.
    sender: broadcast::Sender<BusMessage>,

    /// Active subscriptions by id.
    subscriptions: Registry,

    /// Next subscription id.
    next_subscription: AtomicU64,

    /// Total messages published.
    messages_published: AtomicU64,

    /// Channel capacity (broadcast ring and each work queue).
    capacity: usize,
}

impl InMemoryMessageBus {
    /// Create a new in-memory bus with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a new in-memory bus with specified capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            subscriptions: Arc::new(RwLock::new(HashMap::new())),
            next_subscription: AtomicU64::new(0),
            messages_published: AtomicU64::new(0),
            capacity,
        }
    }

    /// Subscribe to messages matching a filter.
    #[must_use]
    pub fn subscribe(&self, filter: MessageFilter) -> Subscription {
        let receiver = self.sender.subscribe();
        let (queue, queued) = mpsc::channel(self.capacity);
        let id = self.next_subscription.fetch_add(1, Ordering::Relaxed);

        self.subscriptions.write().insert(
            id,
            Registered {
                filter: filter.clone(),
                queue,
            },
        );

        debug!(topics = ?filter.topics, "New subscription created");

        Subscription::new(receiver, queued, filter, Arc::clone(&self.subscriptions), id)
    }

    /// Number of subscriptions whose filter selects `topic`.
    #[must_use]
    pub fn subscribers_for(&self, topic: Topic) -> usize {
        self.subscriptions
            .read()
            .values()
            .filter(|registered| registered.filter.accepts(topic))
            .count()
    }

    /// Hand `message` to every interested work queue, waiting for room.
    async fn enqueue(&self, message: BusMessage) -> Result<usize, BusError> {
        let topic = message.topic;
        let queues: Vec<_> = self
            .subscriptions
            .read()
            .values()
            .filter(|registered| registered.filter.accepts(topic))
            .map(|registered| registered.queue.clone())
            .collect();

        let mut delivered = 0;
        for queue in &queues {
            if queue.capacity() == 0 {
                debug!(topic = ?topic, message_id = %message.message_id, "Work queue full, waiting");
            }
            // A closed queue belongs to a subscription being dropped
            if queue.send(message.clone()).await.is_ok() {
                delivered += 1;
            }
        }

        if delivered == 0 {
            warn!(topic = ?topic, message_id = %message.message_id, "Message dropped (no subscribers)");
            return Err(BusError::NoSubscribers { topic });
        }
        debug!(topic = ?topic, message_id = %message.message_id, receivers = delivered, "Message queued");
        Ok(delivered)
    }

    /// Get the number of active subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Get the channel capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for InMemoryMessageBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessagePublisher for InMemoryMessageBus {
    async fn publish(&self, message: BusMessage) -> Result<usize, BusError> {
        let topic = message.topic;
        let message_id = message.message_id;

        self.messages_published.fetch_add(1, Ordering::Relaxed);

        if topic.is_work_queue() {
            return self.enqueue(message).await;
        }

        let interested = self.subscribers_for(topic);
        if interested == 0 {
            warn!(topic = ?topic, %message_id, "Message dropped (no subscribers)");
            return Err(BusError::NoSubscribers { topic });
        }

        match self.sender.send(message) {
            Ok(_) => {
                debug!(topic = ?topic, %message_id, receivers = interested, "Message published");
                Ok(interested)
            }
            Err(_) => {
                warn!(topic = ?topic, %message_id, "Message dropped (no receivers)");
                Err(BusError::NoSubscribers { topic })
            }
        }
    }

    fn messages_published(&self) -> u64 {
        self.messages_published.load(Ordering::Relaxed)
    }
}
