//! Inbound message abstraction and receive outcomes.

use std::time::Duration;

/// What the idempotent receiver needs to know about a message.
pub trait InboundMessage: Send + Sync {
    /// Deduplication key: the tracking/message id, or the control file name
    /// for DTS.
    fn dedup_key(&self) -> &str;

    /// The sender asked for an acknowledgment.
    fn ack_requested(&self) -> bool;

    /// The message is itself an acknowledgment (never acked back).
    fn is_acknowledgment(&self) -> bool;

    /// Whether an ack should be sent for this message.
    fn wants_ack(&self) -> bool {
        self.ack_requested() && !self.is_acknowledgment()
    }
}

/// Kind of ack sent back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AckKind {
    /// Payload published (or already published).
    Success,
    /// Payload could not be published.
    Failure,
}

/// Result of a successful `receive`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiveOutcome {
    /// The key was already marked; nothing was published.
    pub duplicate: bool,
    /// The ack that was sent, if any.
    pub ack: Option<AckKind>,
}

/// Publish retry settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiverConfig {
    /// Extra publish attempts after the first.
    pub publish_redeliveries: u32,
    /// Pause between publish attempts.
    pub publish_redelivery_delay: Duration,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            publish_redeliveries: 5,
            publish_redelivery_delay: Duration::from_secs(1),
        }
    }
}

impl ReceiverConfig {
    pub fn max_publish_attempts(&self) -> u32 {
        self.publish_redeliveries.saturating_add(1)
    }
}
