//! Pure ebXML domain: envelope, replies, multipart model.

pub mod envelope;
pub mod errors;
pub mod multipart;
pub mod outbound;
pub mod replies;

pub use envelope::*;
pub use errors::{BuildError, EnvelopeCodecError, MultipartError, OutboundMessageError};
pub use multipart::{MultipartBody, Part, DEFAULT_BOUNDARY, DEFAULT_CONTENT_TRANSFER_ENCODING};
pub use outbound::OutboundMessage;
