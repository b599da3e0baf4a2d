//! # Idempotent Receiver (mhs-03)
//!
//! Processes each inbound payload at most once even when the remote party
//! redelivers it, and tells the sender what happened.
//!
//! ## Contract
//!
//! | Situation | Publish | Ack (if requested and not itself an ack) |
//! |-----------|---------|------------------------------------------|
//! | first sight, publish ok | once | success |
//! | repeat sight | skipped | success |
//! | publish fails after retries | - (mark rolled back) | failure |
//!
//! The dedup mark and the publish behave as one unit: a failed publish
//! removes the mark, so the next redelivery is processed from scratch.
//!
//! ## Module Structure
//!
//! ```text
//! adapters/ebxml.rs  - EbxmlInboundMessage, EbxmlMessageReceiver (routing)
//! adapters/bus.rs    - BusPayloadSink, EbxmlAckSender
//! ports/outbound.rs  - PayloadSink, AckSender, NoopAckSender
//! service/receiver.rs - IdempotentReceiver<M>
//! domain/            - InboundMessage, ReceiveOutcome, errors
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::{BusPayloadSink, EbxmlAckSender, EbxmlInboundMessage, EbxmlMessageReceiver, InboundDisposition};
pub use domain::{
    AckError, AckKind, InboundMessage, ReceiveError, ReceiveOutcome, ReceiverConfig, SinkError,
};
pub use ports::{AckSender, NoopAckSender, PayloadSink};
pub use service::IdempotentReceiver;
