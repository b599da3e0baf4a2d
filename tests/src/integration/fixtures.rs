//! Shared test doubles and builders.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use mhs_01_ebxml::codec::{boundary_from_content_type, decode, encode, related_content_type};
use mhs_01_ebxml::{
    Destination, Envelope, EnvelopeCodec, ManifestMessageBuilder, MultipartBody, OutboundMessage,
    SoapEnvelopeCodec,
};
use mhs_02_forward_express::{DeliveryError, HttpDelivery, HttpResponse};
use parking_lot::Mutex;
use shared_bus::{BusMessage, InMemoryMessageBus, MessagePublisher, Topic};

/// What the remote MHS does with the next POST.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteReply {
    /// 202, then an acknowledgment on the inbound channel.
    Ack,
    /// 202, then a delivery failure notification (severity `Warning`).
    Warning,
    /// 202, then a SOAP fault (severity `Error`).
    Fault,
    /// 202 and nothing else.
    Silent,
    /// 500 with a SOAP fault body.
    HttpFault,
    /// Connection refused.
    Unreachable,
}

/// Remote MHS double. Replies arrive on `Topic::InboundMessage` like a real
/// remote party's asynchronous acks. Unscripted POSTs get `Ack`.
pub struct ScriptedRemote {
    bus: Arc<InMemoryMessageBus>,
    script: Mutex<VecDeque<RemoteReply>>,
    posts: Mutex<Vec<OutboundMessage>>,
}

impl ScriptedRemote {
    pub fn new(bus: Arc<InMemoryMessageBus>, script: Vec<RemoteReply>) -> Self {
        Self {
            bus,
            script: Mutex::new(script.into()),
            posts: Mutex::new(Vec::new()),
        }
    }

    pub fn posts(&self) -> Vec<OutboundMessage> {
        self.posts.lock().clone()
    }

    fn publish_later(&self, reply: Envelope) {
        let bus = self.bus.clone();
        tokio::spawn(async move {
            tokio::task::yield_now().await;
            let _ = bus.publish(reply_message(&reply)).await;
        });
    }
}

#[async_trait]
impl HttpDelivery for ScriptedRemote {
    async fn deliver(&self, message: &OutboundMessage) -> Result<HttpResponse, DeliveryError> {
        self.posts.lock().push(message.clone());
        let next = self.script.lock().pop_front().unwrap_or(RemoteReply::Ack);
        let request = root_envelope(message);

        match next {
            RemoteReply::Ack => self.publish_later(request.generate_acknowledgment()),
            RemoteReply::Warning => self.publish_later(
                request.generate_delivery_failure_notification("receiver busy"),
            ),
            RemoteReply::Fault => {
                self.publish_later(request.generate_soap_fault("Client", "unknown interaction"))
            }
            RemoteReply::Silent => {}
            RemoteReply::HttpFault => {
                let fault = request.generate_soap_fault("Server", "schema validation failed");
                return Ok(HttpResponse {
                    status: 500,
                    content_type: Some(SoapEnvelopeCodec::CONTENT_TYPE.to_string()),
                    body: SoapEnvelopeCodec.encode(&fault).unwrap(),
                });
            }
            RemoteReply::Unreachable => {
                return Err(DeliveryError::Connection("connection refused".into()))
            }
        }

        Ok(HttpResponse {
            status: 202,
            content_type: None,
            body: Bytes::new(),
        })
    }
}

/// A manifest message with an HL7 part and a business part.
pub fn manifest_message() -> OutboundMessage {
    ManifestMessageBuilder::new(Envelope::default(), Arc::new(SoapEnvelopeCodec))
        .build(
            &Destination {
                service: "urn:nhs:names:services:itk".into(),
                action: "COPC_IN000001GB01".into(),
                ..Destination::default()
            },
            "<hl7/>",
            "<DischargeSummary/>",
        )
        .unwrap()
}

/// Decode the root envelope of a multipart message.
pub fn root_envelope(message: &OutboundMessage) -> Envelope {
    let boundary = boundary_from_content_type(&message.content_type).unwrap();
    let body = decode(&message.body, &boundary).unwrap();
    SoapEnvelopeCodec.decode(&body.parts[0].body).unwrap()
}

/// A single-part multipart reply as posted by a remote MHS.
pub fn reply_message(envelope: &Envelope) -> BusMessage {
    let mut body = MultipartBody::default();
    let start = body
        .add_part(
            SoapEnvelopeCodec::CONTENT_TYPE,
            SoapEnvelopeCodec.encode(envelope).unwrap(),
        )
        .raw_content_id()
        .unwrap();
    let content_type =
        related_content_type(&body.boundary, SoapEnvelopeCodec::CONTENT_TYPE, &start);
    BusMessage::new(Topic::InboundMessage, encode(&body)).with_content_type(content_type)
}

/// Decode a bus message carrying a multipart body.
pub fn bus_root_envelope(message: &BusMessage) -> Envelope {
    let outbound = OutboundMessage::from_bus_message(message).unwrap();
    root_envelope(&outbound)
}
