//! Application services for the receive path.

pub mod receiver;

pub use receiver::IdempotentReceiver;
