//! Correlation ID for request/acknowledgment matching.
//!
//! Outbound messages are correlated by their ebXML `message_id`, which is
//! chosen by whoever built the envelope and arrives back as the
//! `ref_to_message_id` of the remote acknowledgment. It is therefore kept
//! as an opaque string rather than a parsed UUID.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Correlation ID for tracking an exchange through the system.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Generate a new correlation ID (UUID v4, upper-case like ebXML message ids)
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string().to_uppercase())
    }

    /// Get the raw identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into the raw identifier
    pub fn into_inner(self) -> String {
        self.0
    }

    /// True when the identifier is empty (never a valid correlation key)
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for CorrelationId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for CorrelationId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl AsRef<str> for CorrelationId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
