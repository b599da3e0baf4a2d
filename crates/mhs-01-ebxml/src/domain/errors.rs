//! ebXML subsystem error types.

use thiserror::Error;

/// Multipart parse errors. Never recovered silently.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MultipartError {
    /// The body contains no delimiter for the boundary.
    #[error("boundary {boundary:?} not found in body")]
    MissingBoundary { boundary: String },

    /// A part or the close delimiter is cut off.
    #[error("truncated multipart body: {0}")]
    Truncated(String),

    /// A part header line could not be parsed.
    #[error("malformed part header: {0:?}")]
    MalformedHeader(String),

    /// The Content-Type is not multipart or has no boundary parameter.
    #[error("no multipart boundary in content type {0:?}")]
    NoBoundaryParameter(String),
}

/// Envelope (de)serialization errors.
#[derive(Debug, Error)]
pub enum EnvelopeCodecError {
    #[error("failed to encode envelope: {0}")]
    Encode(String),

    #[error("failed to decode envelope: {0}")]
    Decode(String),
}

/// Errors building an outbound manifest message.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Codec(#[from] EnvelopeCodecError),

    #[error("manifest has no message id after defaults were applied")]
    MissingMessageId,
}

/// A bus message that cannot be sent as an ebXML message.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OutboundMessageError {
    #[error("bus message {0} has no correlation id")]
    MissingCorrelationId(String),

    #[error("bus message {0} has no content type")]
    MissingContentType(String),
}
