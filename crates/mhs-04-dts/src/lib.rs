//! # DTS File-Drop Receiver (mhs-04)
//!
//! Picks up messages dropped into a shared folder by the DTS client. Each
//! message is a pair of files with a common stem:
//!
//! | File | Contents |
//! |------|----------|
//! | `<prefix><id>.ctl` | control file (`DTSControl` XML: message type, workflow, addressing) |
//! | `<prefix><id>.dat` | payload, opaque bytes |
//!
//! ## Flow
//!
//! ```text
//!   DTS folder ──scan──→ DtsMessageReceiver ──→ FilePairPoller (.dat present?)
//!                               │
//!                               ↓
//!                      IdempotentReceiver (key = control file name)
//!                               │
//!                               ↓
//!                         DtsBusSink ──→ Topic::DtsPayload
//!
//!   success: delete .dat and .ctl
//!   failure: move .dat to <errorFolder>, keep .ctl
//! ```
//!
//! ## Invariants
//!
//! | Invariant | Enforcement |
//! |-----------|-------------|
//! | A control file is processed by one task at a time | in-progress `KeyStore::add()` |
//! | A published name is never published again | processed `KeyStore` shared with `IdempotentReceiver` |
//! | Only `Data` control files are published | `ControlFile::is_data()` |
//! | Files outside `<prefix>*.ctl` are never touched | `is_control_file_for()` |
//!
//! ## Module Structure (Hexagonal Architecture)
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  adapters/ - tokio::fs folder, bus payload sink                 │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ implements ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  ports/outbound.rs - FileStore                                  │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ uses ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  service/ - FilePairPoller, DtsMessageReceiver                  │
//! │  domain/  - ControlFile, DtsMessage, naming, DtsConfig, errors  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::{DtsBusSink, TokioFileStore};
pub use domain::{
    data_file_name, is_control_file_for, ControlFile, DtsConfig, DtsError, DtsMessage,
    DtsMessageType,
};
pub use ports::FileStore;
pub use service::{DtsDisposition, DtsMessageReceiver, FilePairPoller};
