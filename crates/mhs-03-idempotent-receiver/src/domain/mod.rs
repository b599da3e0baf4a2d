//! Domain layer for the receive path.

pub mod errors;
pub mod message;

pub use errors::{AckError, ReceiveError, SinkError};
pub use message::{AckKind, InboundMessage, ReceiveOutcome, ReceiverConfig};
