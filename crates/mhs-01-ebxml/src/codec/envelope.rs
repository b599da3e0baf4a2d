//! Envelope serialization port.
//!
//! The exchange and receiver logic only needs to turn envelopes into part
//! bodies and back; the rendering is injected through `EnvelopeCodec`.
//! `SoapEnvelopeCodec` (ebMS 2.0 over SOAP 1.1) is the wire rendering.

use crate::domain::envelope::Envelope;
use crate::domain::errors::EnvelopeCodecError;
use bytes::Bytes;

/// Converts envelopes to and from part bodies.
pub trait EnvelopeCodec: Send + Sync {
    /// MIME type of encoded envelopes (used for the root part and the
    /// multipart `type` parameter).
    fn content_type(&self) -> &str;

    /// Serialize an envelope.
    fn encode(&self, envelope: &Envelope) -> Result<Bytes, EnvelopeCodecError>;

    /// Parse an envelope.
    fn decode(&self, data: &[u8]) -> Result<Envelope, EnvelopeCodecError>;

    /// True when `content_type` (parameters ignored) is this codec's type.
    fn accepts(&self, content_type: &str) -> bool {
        let media_type = content_type.split(';').next().unwrap_or_default().trim();
        media_type.eq_ignore_ascii_case(self.content_type())
    }
}
