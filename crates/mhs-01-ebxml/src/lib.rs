//! # ebXML Messaging Model (mhs-01)
//!
//! Pure data model and wire codecs for ebXML messages carried over HTTP as
//! `multipart/related` bodies. Nothing in this crate performs I/O.
//!
//! ## Components
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `domain::envelope` | `Envelope` value, `with_defaults()`, `merged_with()`, predicates |
//! | `domain::replies` | acknowledgment, SOAP fault, delivery failure notification |
//! | `domain::multipart` | `MultipartBody` / `Part` model, content id forms |
//! | `codec::multipart` | byte-exact multipart encode/decode, Content-Type helpers |
//! | `codec::envelope` | `EnvelopeCodec` port |
//! | `codec::soap` | ebMS 2.0 SOAP rendering (`text/xml`) |
//! | `builder` | manifest message (envelope + HL7 + business part) |
//!
//! ## Envelope Classification
//!
//! ```text
//! error present ──┬── code == DeliveryFailure ──→ delivery failure notification
//!                 └── otherwise ────────────────→ SOAP fault
//! references non-empty ─────────────────────────→ manifest
//! acknowledgment flag ──────────────────────────→ acknowledgment
//! ```
//!
//! Codes and severities compare case-insensitively. Equality and hashing
//! of envelopes use the message id only.

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod builder;
pub mod codec;
pub mod domain;

pub use builder::{Destination, ManifestMessageBuilder};
pub use codec::{EnvelopeCodec, SoapEnvelopeCodec};
pub use domain::{
    BuildError, Envelope, EnvelopeCodecError, ErrorDetail, ManifestReference, MessageData,
    MultipartBody, MultipartError, OutboundMessage, OutboundMessageError, Part,
};
