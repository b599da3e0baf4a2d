//! Ports layer for the receive path.

pub mod outbound;

pub use outbound::{AckSender, NoopAckSender, PayloadSink};
