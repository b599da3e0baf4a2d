//! ebXML multipart receiver.
//!
//! Routes `Topic::InboundMessage` traffic:
//!
//! | Inbound envelope | Route |
//! |------------------|-------|
//! | acknowledgment or error message | `Topic::EbxmlAck`, correlated by `ref_to_message_id` |
//! | anything else | `IdempotentReceiver`, keyed by `message_id` |
//!
//! A body that cannot be parsed is rejected permanently.

use crate::domain::{InboundMessage, ReceiveError, ReceiveOutcome};
use crate::service::IdempotentReceiver;
use bytes::Bytes;
use mhs_01_ebxml::codec::multipart::{boundary_from_content_type, decode};
use mhs_01_ebxml::{Envelope, EnvelopeCodec, MultipartBody, Part};
use shared_bus::{BusMessage, MessagePublisher, Subscription, Topic, HEADER_SOAP_ACTION};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// A parsed inbound ebXML message.
#[derive(Debug, Clone)]
pub struct EbxmlInboundMessage {
    pub envelope: Envelope,
    pub multipart: MultipartBody,
    /// Encoded root envelope as received.
    pub envelope_body: Bytes,
}

impl EbxmlInboundMessage {
    /// Parse a `multipart/related` body whose first part is an envelope.
    ///
    /// # Errors
    ///
    /// `ReceiveError::Rejected` for any parse failure.
    pub fn parse(
        content_type: &str,
        body: &Bytes,
        codec: &dyn EnvelopeCodec,
    ) -> Result<Self, ReceiveError> {
        let boundary = boundary_from_content_type(content_type)
            .map_err(|e| ReceiveError::Rejected(e.to_string()))?;
        let multipart = decode(body, &boundary).map_err(|e| ReceiveError::Rejected(e.to_string()))?;
        let root = multipart
            .first_part()
            .ok_or_else(|| ReceiveError::Rejected("multipart body has no parts".into()))?;
        let envelope = codec
            .decode(&root.body)
            .map_err(|e| ReceiveError::Rejected(e.to_string()))?;
        let envelope_body = root.body.clone();

        Ok(Self {
            envelope,
            multipart,
            envelope_body,
        })
    }

    /// Parts carrying the business payload.
    ///
    /// For a manifest these are the referenced parts in manifest order;
    /// otherwise every part after the root envelope.
    pub fn payload_parts(&self) -> Vec<&Part> {
        if self.envelope.is_manifest() {
            self.envelope
                .references
                .iter()
                .filter_map(|reference| self.multipart.find_part_by_content_id(&reference.href))
                .collect()
        } else {
            self.multipart.parts.iter().skip(1).collect()
        }
    }

    /// True for acks and error messages, which belong to the send path.
    pub fn is_reply(&self) -> bool {
        self.envelope.is_acknowledgment() || self.envelope.is_error_message()
    }
}

impl InboundMessage for EbxmlInboundMessage {
    fn dedup_key(&self) -> &str {
        self.envelope.message_id().unwrap_or_default()
    }

    fn ack_requested(&self) -> bool {
        self.envelope.ack_requested
    }

    fn is_acknowledgment(&self) -> bool {
        self.envelope.is_acknowledgment()
    }
}

/// What happened to one inbound bus message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundDisposition {
    /// Reply forwarded to the ack channel.
    ForwardedReply,
    /// Processed by the idempotent receiver.
    Received(ReceiveOutcome),
}

pub struct EbxmlMessageReceiver {
    receiver: IdempotentReceiver<EbxmlInboundMessage>,
    publisher: Arc<dyn MessagePublisher>,
    codec: Arc<dyn EnvelopeCodec>,
}

impl EbxmlMessageReceiver {
    pub fn new(
        receiver: IdempotentReceiver<EbxmlInboundMessage>,
        publisher: Arc<dyn MessagePublisher>,
        codec: Arc<dyn EnvelopeCodec>,
    ) -> Self {
        Self {
            receiver,
            publisher,
            codec,
        }
    }

    /// Route one inbound bus message.
    pub async fn handle(&self, message: &BusMessage) -> Result<InboundDisposition, ReceiveError> {
        let content_type = message
            .content_type
            .as_deref()
            .ok_or_else(|| ReceiveError::Rejected("inbound message has no content type".into()))?;
        let inbound = EbxmlInboundMessage::parse(content_type, &message.body, self.codec.as_ref())?;

        if inbound.is_reply() {
            return self.forward_reply(&inbound).await;
        }

        debug!(
            message_id = %inbound.dedup_key(),
            soap_action = %inbound.envelope.soap_action(),
            "Inbound ebXML message"
        );
        let outcome = self.receiver.receive(&inbound).await?;
        Ok(InboundDisposition::Received(outcome))
    }

    async fn forward_reply(
        &self,
        inbound: &EbxmlInboundMessage,
    ) -> Result<InboundDisposition, ReceiveError> {
        let correlation_id = inbound
            .envelope
            .ref_to_message_id()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ReceiveError::Rejected("reply has no ref_to_message_id".into()))?;

        let reply = BusMessage::new(Topic::EbxmlAck, inbound.envelope_body.clone())
            .with_correlation_id(correlation_id)
            .with_content_type(self.codec.content_type());
        self.publisher.publish(reply).await?;

        info!(
            event = "spine-multipart-message-reply-received",
            correlation_id = %correlation_id,
            acknowledgment = inbound.envelope.is_acknowledgment(),
            "Forwarded reply to ack channel"
        );
        Ok(InboundDisposition::ForwardedReply)
    }

    /// Consume inbound messages until shutdown.
    pub async fn run(&self, mut subscription: Subscription, mut shutdown: watch::Receiver<bool>) {
        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                message = subscription.recv() => {
                    let Some(message) = message else { break };
                    if let Err(e) = self.handle(&message).await {
                        warn!(
                            message_id = %message.message_id,
                            soap_action = message.header(HEADER_SOAP_ACTION).unwrap_or_default(),
                            retryable = e.is_retryable(),
                            error = %e,
                            "Inbound message not processed"
                        );
                    }
                }
            }
        }
        debug!("Inbound receiver stopped");
    }
}
