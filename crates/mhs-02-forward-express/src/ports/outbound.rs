//! Outbound (Driven) ports for the ForwardExpress send path.

use crate::domain::{DeliveryError, ResponseError, SendResponse};
use async_trait::async_trait;
use bytes::Bytes;
use mhs_01_ebxml::OutboundMessage;

/// Response returned by the remote MHS for a POST.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl HttpResponse {
    /// Any 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP delivery to the remote MHS.
#[async_trait]
pub trait HttpDelivery: Send + Sync {
    /// POST the message body with its `Content-Type` and `SOAPAction`.
    ///
    /// A non-2xx answer is still `Ok`; only transport failures are errors.
    async fn deliver(&self, message: &OutboundMessage) -> Result<HttpResponse, DeliveryError>;
}

/// The application's response channel.
#[async_trait]
pub trait ResponseSink: Send + Sync {
    async fn publish_response(&self, response: SendResponse) -> Result<(), ResponseError>;
}

#[cfg(test)]
pub use mocks::{MockHttpDelivery, RecordingResponseSink, Scripted};
