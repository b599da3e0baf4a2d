//! Ports layer for the DTS transport.

pub mod outbound;

pub use outbound::FileStore;
