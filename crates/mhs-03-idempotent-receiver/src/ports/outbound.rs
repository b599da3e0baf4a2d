//! Outbound (Driven) ports for the receive path.

use crate::domain::{AckError, AckKind, InboundMessage, SinkError};
use async_trait::async_trait;

/// Downstream consumer of accepted payloads.
#[async_trait]
pub trait PayloadSink<M: InboundMessage>: Send + Sync {
    async fn publish(&self, message: &M) -> Result<(), SinkError>;
}

/// Sends acks back to the message's sender.
#[async_trait]
pub trait AckSender<M: InboundMessage>: Send + Sync {
    async fn send_ack(&self, message: &M, kind: AckKind) -> Result<(), AckError>;
}

/// For transports without an ack channel (DTS).
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAckSender;

#[async_trait]
impl<M: InboundMessage> AckSender<M> for NoopAckSender {
    async fn send_ack(&self, _message: &M, _kind: AckKind) -> Result<(), AckError> {
        Ok(())
    }
}

#[cfg(test)]
pub use mocks::{RecordingAckSender, RecordingPayloadSink};
