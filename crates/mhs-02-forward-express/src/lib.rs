//! # ForwardExpress Send Path (mhs-02)
//!
//! Delivers ebXML manifest messages to a remote MHS over HTTP and learns
//! the outcome from an acknowledgment that arrives later on a separate
//! channel.
//!
//! ## Exchange Pattern
//!
//! ```text
//!  OutboundRequest ──→ OutboundWorker ──→ MultipartMessageSender
//!                                               │  (retry loop)
//!                                               ↓
//!                                      ForwardExpressExchange ──POST──→ remote MHS
//!                                               ↑                           │
//!                                        PendingAckStore                    │
//!                                               ↑                           │
//!                       EbxmlAck ──→ AckListener ←──── (ack, later) ────────┘
//!
//!  MultipartMessageSender ──(ack / fault / delivery failure)──→ SendResponse
//! ```
//!
//! ## Invariants
//!
//! | Invariant | Enforcement |
//! |-----------|-------------|
//! | Waiter exists before the POST | `ForwardExpressExchange::execute()` registers first |
//! | One exchange per correlation id | in-progress `KeyStore::add()` |
//! | Exchange state always cleared | drop guard in `exchange.rs` |
//! | Retries resend identical bytes | `MultipartMessageSender::send()` reuses the message |
//! | Only definitive outcomes are published | `AttemptOutcome::Retryable` never reaches `ResponseSink` |
//!
//! ## Module Structure (Hexagonal Architecture)
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  adapters/ - reqwest HTTP delivery, bus response sink           │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ implements ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  ports/outbound.rs - HttpDelivery, ResponseSink                 │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ uses ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  service/ - exchange, sender, ack listener, workers             │
//! │  domain/  - PendingAckStore, outcomes, errors, SenderConfig     │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::{BusResponseSink, ReqwestDelivery};
pub use domain::{
    AttemptOutcome, DeliveryError, ExchangeError, ExchangeOutcome, PendingAckStore,
    SendNotification, SendOutcome, SendResponse, SenderConfig,
};
pub use ports::{HttpDelivery, HttpResponse, ResponseSink};
pub use service::{
    AckDisposition, AckForwarder, AckListener, ForwardExpressExchange, MultipartMessageSender,
    OutboundWorker,
};
