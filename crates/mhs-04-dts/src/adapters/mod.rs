//! Adapters for the DTS transport.

pub mod bus;
pub mod fs;

pub use bus::DtsBusSink;
pub use fs::TokioFileStore;
