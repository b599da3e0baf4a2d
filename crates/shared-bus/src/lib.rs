//! # Shared Bus - Message Broker for the MHS Transport
//!
//! Stands in for the JMS-style broker the transport talks to: outbound
//! request queues, the asynchronous ebXML acknowledgment channel and the
//! response/payload topics that applications consume.
//!
//! ## Channels
//!
//! ```text
//!  application ──OutboundRequest──→ ForwardExpress sender ──HTTP──→ remote MHS
//!                                          ↑                            │
//!                                       EbxmlAck ←──InboundMessage←─────┘
//!                                          │
//!  application ←──SendResponse─────────────┘
//!
//!  remote MHS ──InboundMessage──→ idempotent receiver ──InboundPayload──→ application
//!                                          └──OutboundAck──→ remote MHS
//!
//!  DTS folder ──→ DTS receiver ──DtsPayload──→ application
//! ```
//!
//! ## Delivery Semantics
//!
//! - Every subscriber sees every message on the topics its filter selects.
//! - Work topics (`OutboundRequest`, `InboundMessage`, `EbxmlAck`) use a
//!   bounded queue per subscriber; a full queue makes the publisher wait.
//!   Other topics are broadcast, and a subscriber more than
//!   `DEFAULT_CHANNEL_CAPACITY` messages behind skips the oldest ones with a
//!   warning.
//! - Publishing to a topic nobody listens on is an error (`BusError::NoSubscribers`)
//!   so that senders can treat it as a failed publish.
//! - Transport message ids are unique per publish; redelivered copies of a
//!   message are detected with the `TimeBoundedSeenCache`.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod publisher;
pub mod seen_cache;
pub mod subscriber;
pub mod topics;

// Re-export main types
pub use publisher::{BusError, InMemoryMessageBus, MessagePublisher};
pub use seen_cache::TimeBoundedSeenCache;
pub use subscriber::{Subscription, SubscriptionError};
pub use topics::{BusMessage, MessageFilter, Topic};

/// Messages buffered per subscriber: broadcast ring size and work queue bound.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;

/// Header carrying the HTTP `SOAPAction` of an outbound ebXML message.
pub const HEADER_SOAP_ACTION: &str = "SOAPAction";

/// Header carrying the send notification (`sent` / `send-failed`) on responses.
pub const HEADER_SEND_NOTIFICATION: &str = "X-Send-Notification";

/// Header carrying the raw DTS control file alongside a DTS payload.
pub const HEADER_DTS_CONTROL_FILE: &str = "X-DTS-Control-File";

/// Header carrying the DTS control file name alongside a DTS payload.
pub const HEADER_DTS_CONTROL_FILE_NAME: &str = "X-DTS-Control-File-Name";
