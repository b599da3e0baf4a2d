//! Bus adapters for the ebXML receive path.

use crate::adapters::ebxml::EbxmlInboundMessage;
use crate::domain::{AckError, AckKind, InboundMessage, SinkError};
use crate::ports::{AckSender, PayloadSink};
use async_trait::async_trait;
use mhs_01_ebxml::codec::multipart::{encode, related_content_type};
use mhs_01_ebxml::{EnvelopeCodec, MultipartBody, OutboundMessage};
use shared_bus::{BusMessage, MessagePublisher, Topic, HEADER_SOAP_ACTION};
use std::sync::Arc;
use tracing::{debug, info};

/// Description carried by failure notifications sent from the receive path.
pub const PROCESSING_FAILED: &str = "Unable to process inbound message";

/// Publishes accepted payloads on `Topic::InboundPayload`.
///
/// The payload is re-wrapped as a multipart holding only the payload parts
/// (content ids kept), correlated by the inbound message id.
pub struct BusPayloadSink {
    publisher: Arc<dyn MessagePublisher>,
}

impl BusPayloadSink {
    pub fn new(publisher: Arc<dyn MessagePublisher>) -> Self {
        Self { publisher }
    }
}

#[async_trait]
impl PayloadSink<EbxmlInboundMessage> for BusPayloadSink {
    async fn publish(&self, message: &EbxmlInboundMessage) -> Result<(), SinkError> {
        let parts: Vec<_> = message.payload_parts().into_iter().cloned().collect();
        let root_type = parts
            .first()
            .and_then(|part| part.content_type.clone())
            .unwrap_or_else(|| "application/octet-stream".to_string());
        let start = parts
            .first()
            .and_then(|part| part.raw_content_id())
            .unwrap_or_default();
        let payload = MultipartBody {
            parts,
            ..MultipartBody::default()
        };

        let bus_message = BusMessage::new(Topic::InboundPayload, encode(&payload))
            .with_correlation_id(message.dedup_key())
            .with_content_type(related_content_type(&payload.boundary, &root_type, &start))
            .with_header(HEADER_SOAP_ACTION, message.envelope.soap_action());

        self.publisher.publish(bus_message).await?;
        debug!(message_id = %message.dedup_key(), "Published inbound payload");
        Ok(())
    }
}

/// Sends acks and delivery failure notifications back to the remote MHS
/// via `Topic::OutboundAck`.
pub struct EbxmlAckSender {
    publisher: Arc<dyn MessagePublisher>,
    codec: Arc<dyn EnvelopeCodec>,
}

impl EbxmlAckSender {
    pub fn new(publisher: Arc<dyn MessagePublisher>, codec: Arc<dyn EnvelopeCodec>) -> Self {
        Self { publisher, codec }
    }

    /// Wrap a reply envelope as a single-part multipart message.
    pub fn reply_message(
        &self,
        message: &EbxmlInboundMessage,
        kind: AckKind,
    ) -> Result<OutboundMessage, AckError> {
        let reply = match kind {
            AckKind::Success => message.envelope.generate_acknowledgment(),
            AckKind::Failure => message
                .envelope
                .generate_delivery_failure_notification(PROCESSING_FAILED),
        };
        let correlation_id = reply.correlation_id().ok_or(AckError::MissingMessageId)?;

        let mut body = MultipartBody::default();
        let start = body
            .add_part(self.codec.content_type(), self.codec.encode(&reply)?)
            .raw_content_id()
            .unwrap_or_default();

        Ok(OutboundMessage {
            correlation_id,
            content_type: related_content_type(&body.boundary, self.codec.content_type(), &start),
            soap_action: Some(reply.soap_action()),
            body: encode(&body),
        })
    }
}

#[async_trait]
impl AckSender<EbxmlInboundMessage> for EbxmlAckSender {
    async fn send_ack(&self, message: &EbxmlInboundMessage, kind: AckKind) -> Result<(), AckError> {
        let outbound = self.reply_message(message, kind)?;
        self.publisher
            .publish(outbound.to_bus_message(Topic::OutboundAck))
            .await?;

        info!(
            event = "spine-ack-queued",
            message_id = %message.dedup_key(),
            ack_id = %outbound.correlation_id,
            kind = ?kind,
            "Queued ack"
        );
        Ok(())
    }
}
