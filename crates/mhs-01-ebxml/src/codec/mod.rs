//! Wire codecs: multipart framing and envelope rendering.

pub mod envelope;
pub mod multipart;
pub mod soap;

pub use envelope::EnvelopeCodec;
pub use multipart::{boundary_from_content_type, decode, encode, related_content_type};
pub use soap::SoapEnvelopeCodec;
