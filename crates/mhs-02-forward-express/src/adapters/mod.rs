//! Adapters for the ForwardExpress ports.

pub mod bus;
pub mod http;

pub use bus::BusResponseSink;
pub use http::ReqwestDelivery;
