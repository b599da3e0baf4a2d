//! Error types for the receive path.

use mhs_01_ebxml::EnvelopeCodecError;
use shared_bus::BusError;
use thiserror::Error;

/// Errors receiving one inbound message.
#[derive(Debug, Error)]
pub enum ReceiveError {
    /// The message has nothing to deduplicate on.
    #[error("message has no dedup key")]
    MissingKey,

    /// The payload could not be published. The dedup mark was rolled back.
    #[error("failed to publish {key} after {attempts} attempts: {source}")]
    PublishFailed {
        key: String,
        attempts: u32,
        #[source]
        source: SinkError,
    },

    /// The message can never be processed. Redelivery will not help.
    #[error("rejected inbound message: {0}")]
    Rejected(String),

    /// An ack or error reply could not be forwarded to the ack channel.
    #[error("failed to forward reply: {0}")]
    Forward(#[from] BusError),
}

impl ReceiveError {
    /// True when redelivering the same message could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::PublishFailed { .. } | Self::Forward(_))
    }
}

/// Errors publishing a payload downstream.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("bus publish failed: {0}")]
    Bus(#[from] BusError),

    #[error("sink unavailable: {0}")]
    Unavailable(String),
}

/// Errors sending an ack.
#[derive(Debug, Error)]
pub enum AckError {
    #[error("ack publish failed: {0}")]
    Bus(#[from] BusError),

    #[error(transparent)]
    Codec(#[from] EnvelopeCodecError),

    #[error("reply has no message id")]
    MissingMessageId,
}
