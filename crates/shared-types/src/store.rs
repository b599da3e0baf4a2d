//! # Key Store
//!
//! Idempotency port shared by the exchange (in-progress correlation ids),
//! the idempotent receiver (seen message ids) and the DTS receiver
//! (processed and in-progress control file names).
//!
//! ## Contract
//!
//! - `add()` is the atomic check-and-mark: exactly one concurrent caller
//!   observes `true` for a given key.
//! - `remove()` rolls a mark back so the key can be processed again.
//! - Entries never expire on their own. Operators call `expunge()` or
//!   `expunge_older_than()`.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::time::{Duration, Instant};
use tracing::debug;

/// Store of seen/in-progress keys.
pub trait KeyStore: Send + Sync {
    /// Atomically mark `key`. Returns `false` if it was already present.
    fn add(&self, key: &str) -> bool;

    /// Check whether `key` is marked.
    fn contains(&self, key: &str) -> bool;

    /// Remove the mark for `key`. Returns `true` if it was present.
    fn remove(&self, key: &str) -> bool;

    /// Number of marked keys.
    fn len(&self) -> usize;

    /// Check if no keys are marked.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every mark.
    fn expunge(&self);
}

/// In-memory `KeyStore` backed by a `DashMap`.
///
/// Each entry records when it was marked so that long-running nodes can
/// bound memory with `expunge_older_than()`.
#[derive(Debug, Default)]
pub struct InMemoryKeyStore {
    name: &'static str,
    entries: DashMap<String, Instant>,
}

impl InMemoryKeyStore {
    /// Create an empty store. `name` only appears in logs.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: DashMap::new(),
        }
    }

    /// Remove marks older than `max_age`. Returns the number removed.
    pub fn expunge_older_than(&self, max_age: Duration) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries
            .retain(|_, marked_at| now.duration_since(*marked_at) <= max_age);
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            debug!(store = self.name, removed, "Expunged stale keys");
        }
        removed
    }
}

impl KeyStore for InMemoryKeyStore {
    fn add(&self, key: &str) -> bool {
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(vacant) => {
                vacant.insert(Instant::now());
                true
            }
        }
    }

    fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    fn remove(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn expunge(&self) {
        self.entries.clear();
        debug!(store = self.name, "Expunged all keys");
    }
}
