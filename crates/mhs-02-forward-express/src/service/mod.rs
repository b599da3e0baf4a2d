//! Application services for the send path.

pub mod ack_listener;
pub mod exchange;
pub mod sender;
pub mod worker;

pub use ack_listener::{AckDisposition, AckListener};
pub use exchange::{ForwardExpressExchange, DEFAULT_ACK_MARGIN};
pub use sender::{MultipartMessageSender, REDELIVERIES_EXHAUSTED};
pub use worker::{AckForwarder, OutboundWorker};
