//! Service layer for the DTS transport.

pub mod poller;
pub mod receiver;

pub use poller::FilePairPoller;
pub use receiver::{DtsDisposition, DtsMessageReceiver};
