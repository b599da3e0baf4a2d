//! # Shared Types Crate
//!
//! Identifiers and storage ports shared by every transport subsystem.
//!
//! ## Design Principles
//!
//! - **One correlation key**: the outbound ebXML `message_id` is the
//!   `CorrelationId` used by the exchange, the ack listener and the
//!   in-progress set.
//! - **Injectable idempotency**: dedup and in-progress state sit behind the
//!   `KeyStore` port. The in-memory default is safe for concurrent use;
//!   durable backends plug in without touching the subsystems.

pub mod correlation;
pub mod store;

pub use correlation::CorrelationId;
pub use store::{InMemoryKeyStore, KeyStore};
