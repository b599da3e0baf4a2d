//! Ports layer for the ForwardExpress send path.

pub mod outbound;

pub use outbound::{HttpDelivery, HttpResponse, ResponseSink};
