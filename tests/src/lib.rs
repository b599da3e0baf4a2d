//! # MHS Transport Test Suite
//!
//! Cross-crate flows wired the way the runtime wires them, with the remote
//! MHS and the DTS folder replaced by test doubles.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── fixtures.rs      # scripted remote MHS, message builders
//!     ├── send_flow.rs     # mhs-01 → mhs-02 ← mhs-03 (acks arrive inbound)
//!     ├── receive_flow.rs  # mhs-01 → mhs-03 → bus
//!     └── dts_flow.rs      # folder → mhs-04 → mhs-03 → bus
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p mhs-tests
//! cargo test -p mhs-tests integration::send_flow
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod integration;
