//! Outbound multipart message ready for HTTP delivery.

use crate::domain::errors::OutboundMessageError;
use bytes::Bytes;
use shared_bus::{BusMessage, Topic, HEADER_SOAP_ACTION};
use shared_types::CorrelationId;

/// A serialized ebXML message plus the HTTP headers needed to post it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    /// The root envelope's `message_id`.
    pub correlation_id: CorrelationId,
    /// `multipart/related; boundary="..."; type="..."; start="<...>"`
    pub content_type: String,
    /// `service/action` of the root envelope.
    pub soap_action: Option<String>,
    /// Serialized multipart body.
    pub body: Bytes,
}

impl OutboundMessage {
    /// Wrap for publication on `topic`.
    pub fn to_bus_message(&self, topic: Topic) -> BusMessage {
        let message = BusMessage::new(topic, self.body.clone())
            .with_correlation_id(self.correlation_id.clone())
            .with_content_type(self.content_type.clone());
        match &self.soap_action {
            Some(action) => message.with_header(HEADER_SOAP_ACTION, action.clone()),
            None => message,
        }
    }

    /// Rebuild from a bus message.
    ///
    /// # Errors
    ///
    /// The correlation id and content type are required.
    pub fn from_bus_message(message: &BusMessage) -> Result<Self, OutboundMessageError> {
        let correlation_id = message
            .correlation_id
            .clone()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| OutboundMessageError::MissingCorrelationId(message.message_id.to_string()))?;
        let content_type = message
            .content_type
            .clone()
            .ok_or_else(|| OutboundMessageError::MissingContentType(message.message_id.to_string()))?;

        Ok(Self {
            correlation_id,
            content_type,
            soap_action: message.header(HEADER_SOAP_ACTION).map(str::to_string),
            body: message.body.clone(),
        })
    }
}
