//! Explicit outcome kinds for exchanges, attempts and sends.

use bytes::Bytes;
use mhs_01_ebxml::Envelope;
use shared_types::CorrelationId;
use std::fmt;

/// Result of one correlated exchange.
///
/// `complete == false` means the ack did not arrive in time. That is not an
/// error: the caller decides whether to retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeOutcome {
    pub ack_body: Option<Bytes>,
    pub complete: bool,
}

impl ExchangeOutcome {
    pub fn acknowledged(ack_body: Bytes) -> Self {
        Self {
            ack_body: Some(ack_body),
            complete: true,
        }
    }

    pub fn timed_out() -> Self {
        Self {
            ack_body: None,
            complete: false,
        }
    }
}

/// A definitive reply: the decoded envelope plus the bytes to publish.
#[derive(Debug, Clone)]
pub struct Reply {
    pub envelope: Envelope,
    pub content_type: String,
    pub body: Bytes,
}

/// Classification of a single delivery attempt.
#[derive(Debug, Clone)]
pub enum AttemptOutcome {
    /// Positive acknowledgment.
    Success(Reply),
    /// Try again after the redelivery delay.
    Retryable(String),
    /// Stop and publish the reply.
    Terminal(Reply),
}

/// Final result of `MultipartMessageSender::send`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Acknowledged; the ack was published.
    Acknowledged { attempts: u32 },
    /// Terminal rejection; the error reply was published.
    Rejected { attempts: u32 },
    /// Redeliveries exhausted; a delivery failure notification was published.
    Exhausted { attempts: u32 },
    /// The response channel refused the definitive outcome.
    Undeliverable { attempts: u32, reason: String },
}

impl SendOutcome {
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Acknowledged { attempts }
            | Self::Rejected { attempts }
            | Self::Exhausted { attempts }
            | Self::Undeliverable { attempts, .. } => *attempts,
        }
    }

    pub fn is_acknowledged(&self) -> bool {
        matches!(self, Self::Acknowledged { .. })
    }
}

/// Notification attached to every published response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SendNotification {
    Sent,
    SendFailed,
}

impl SendNotification {
    /// Acknowledgments are `Sent`; anything else is `SendFailed`.
    pub fn classify(envelope: &Envelope) -> Self {
        if envelope.is_acknowledgment() && !envelope.is_error_message() {
            Self::Sent
        } else {
            Self::SendFailed
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::SendFailed => "send-failed",
        }
    }
}

impl fmt::Display for SendNotification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A definitive outcome for the application's response channel.
#[derive(Debug, Clone)]
pub struct SendResponse {
    /// Correlation id of the original outbound message.
    pub correlation_id: CorrelationId,
    pub notification: SendNotification,
    pub content_type: String,
    pub body: Bytes,
}
