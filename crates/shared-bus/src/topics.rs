//! # Topics and Bus Messages
//!
//! Defines the unit carried by the bus and the topics it is routed on.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use shared_types::CorrelationId;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Logical destinations on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Topic {
    /// Multipart ebXML messages waiting to be sent with ForwardExpress.
    OutboundRequest,
    /// Generated ebXML acknowledgments waiting to be posted to the remote party.
    OutboundAck,
    /// Raw multipart bodies received from a remote party.
    InboundMessage,
    /// Inbound acknowledgments and message errors, correlated by `ref_to_message_id`.
    EbxmlAck,
    /// Definitive send outcomes (ack, terminal error, delivery failure notification).
    SendResponse,
    /// Business payloads accepted by the idempotent receiver.
    InboundPayload,
    /// Payloads picked up from the DTS folder.
    DtsPayload,
}

impl Topic {
    /// All topics.
    pub const ALL: [Topic; 7] = [
        Topic::OutboundRequest,
        Topic::OutboundAck,
        Topic::InboundMessage,
        Topic::EbxmlAck,
        Topic::SendResponse,
        Topic::InboundPayload,
        Topic::DtsPayload,
    ];

    /// Topics consumed as work queues. Publishers wait for queue room
    /// instead of overwriting unread messages.
    #[must_use]
    pub fn is_work_queue(self) -> bool {
        matches!(
            self,
            Topic::OutboundRequest | Topic::InboundMessage | Topic::EbxmlAck
        )
    }
}

/// A message travelling on the bus.
///
/// `message_id` is the transport-level id, fresh for every publish. The
/// business correlation key travels separately in `correlation_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusMessage {
    /// Transport message id.
    pub message_id: Uuid,
    /// Routing topic.
    pub topic: Topic,
    /// Business correlation id, if any.
    pub correlation_id: Option<CorrelationId>,
    /// MIME type of `body`.
    pub content_type: Option<String>,
    /// Free-form headers (SOAPAction, send notification, DTS control file).
    pub headers: BTreeMap<String, String>,
    /// Payload bytes.
    pub body: Bytes,
}

impl BusMessage {
    /// Create a message with a fresh transport id.
    pub fn new(topic: Topic, body: impl Into<Bytes>) -> Self {
        Self {
            message_id: Uuid::new_v4(),
            topic,
            correlation_id: None,
            content_type: None,
            headers: BTreeMap::new(),
            body: body.into(),
        }
    }

    /// Set the correlation id.
    #[must_use]
    pub fn with_correlation_id(mut self, correlation_id: impl Into<CorrelationId>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    /// Set the content type.
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Add a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Look up a header value.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }
}

/// Filter for subscribing to specific topics.
#[derive(Debug, Clone, Default)]
pub struct MessageFilter {
    /// Topics to subscribe to (empty = all topics).
    pub topics: Vec<Topic>,
}

impl MessageFilter {
    /// Create a filter that accepts all messages.
    #[must_use]
    pub fn all() -> Self {
        Self { topics: Vec::new() }
    }

    /// Create a filter for specific topics.
    #[must_use]
    pub fn topics(topics: Vec<Topic>) -> Self {
        Self { topics }
    }

    /// Create a filter for a single topic.
    #[must_use]
    pub fn topic(topic: Topic) -> Self {
        Self {
            topics: vec![topic],
        }
    }

    /// Check if a message matches this filter.
    #[must_use]
    pub fn matches(&self, message: &BusMessage) -> bool {
        self.accepts(message.topic)
    }

    /// Check if a topic is selected by this filter.
    #[must_use]
    pub fn accepts(&self, topic: Topic) -> bool {
        self.topics.is_empty() || self.topics.contains(&topic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_message_has_fresh_id() {
        let a = BusMessage::new(Topic::EbxmlAck, "x");
        let b = BusMessage::new(Topic::EbxmlAck, "x");
        assert_ne!(a.message_id, b.message_id);
    }

    #[test]
    fn test_builder_fields() {
        let msg = BusMessage::new(Topic::SendResponse, "body")
            .with_correlation_id("corr-1")
            .with_content_type("text/xml")
            .with_header("SOAPAction", "urn:svc/Action");

        assert_eq!(msg.correlation_id.as_ref().map(|c| c.as_str()), Some("corr-1"));
        assert_eq!(msg.content_type.as_deref(), Some("text/xml"));
        assert_eq!(msg.header("SOAPAction"), Some("urn:svc/Action"));
        assert_eq!(msg.header("missing"), None);
    }

    #[test]
    fn test_work_queue_topics() {
        let work: Vec<_> = Topic::ALL.into_iter().filter(|t| t.is_work_queue()).collect();
        assert_eq!(
            work,
            vec![Topic::OutboundRequest, Topic::InboundMessage, Topic::EbxmlAck]
        );
    }

    #[test]
    fn test_filter_all_matches_everything() {
        let filter = MessageFilter::all();
        for topic in Topic::ALL {
            assert!(filter.accepts(topic));
        }
    }

    #[test]
    fn test_filter_specific_topic() {
        let filter = MessageFilter::topic(Topic::EbxmlAck);
        assert!(filter.matches(&BusMessage::new(Topic::EbxmlAck, "")));
        assert!(!filter.matches(&BusMessage::new(Topic::SendResponse, "")));
    }
}
