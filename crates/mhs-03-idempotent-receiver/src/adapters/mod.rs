//! Adapters for the receive path.

pub mod bus;
pub mod ebxml;

pub use bus::{BusPayloadSink, EbxmlAckSender, PROCESSING_FAILED};
pub use ebxml::{EbxmlInboundMessage, EbxmlMessageReceiver, InboundDisposition};
