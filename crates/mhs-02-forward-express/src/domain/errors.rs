//! Error types for the ForwardExpress send path.

use bytes::Bytes;
use mhs_01_ebxml::{EnvelopeCodecError, MultipartError};
use shared_bus::BusError;
use shared_types::CorrelationId;
use thiserror::Error;

/// Errors raised by the `HttpDelivery` port.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    /// The remote endpoint could not be reached.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The request timed out before a response arrived.
    #[error("request timed out")]
    Timeout,
}

/// Errors raised by a single correlated exchange.
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// The HTTP request failed outright. No ack is awaited.
    ///
    /// `status` is absent for connection-level failures; `body` holds the
    /// response body when the remote answered with a non-2xx status.
    #[error("request failed (status {status:?}): {reason}")]
    RequestFailed {
        status: Option<u16>,
        content_type: Option<String>,
        body: Bytes,
        reason: String,
    },

    /// Another exchange for the same correlation id is still running.
    #[error("exchange {0} already in progress")]
    AlreadyInProgress(CorrelationId),
}

/// Errors publishing a definitive outcome.
#[derive(Debug, Error)]
pub enum ResponseError {
    #[error("failed to publish response: {0}")]
    Bus(#[from] BusError),
}

/// The outbound message's own manifest could not be read back.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error(transparent)]
    Multipart(#[from] MultipartError),

    #[error(transparent)]
    Codec(#[from] EnvelopeCodecError),

    #[error("multipart body has no manifest part")]
    MissingManifestPart,
}
