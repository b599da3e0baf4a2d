//! # Time-Bounded Seen Cache
//!
//! Detects redelivered copies of the same bus message.
//!
//! A broker may hand the same transport message to a consumer more than
//! once. Consumers that must act once per message (the ack listener
//! completing a waiter) record each transport id here and drop repeats.
//!
//! - Ids are remembered for `validity_window` after first sight
//! - Expired ids are garbage-collected every `gc_interval`
//! - Memory is bounded by the publish rate times the window

use std::collections::HashMap;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Time-bounded cache of transport message ids.
#[derive(Debug)]
pub struct TimeBoundedSeenCache {
    /// Map of message id -> instant it was first seen.
    cache: HashMap<Uuid, Instant>,

    /// How long an id is remembered.
    validity_window: Duration,

    /// Last garbage collection.
    last_gc: Instant,

    /// Garbage collection interval.
    gc_interval: Duration,
}

impl TimeBoundedSeenCache {
    /// Default validity window.
    pub const DEFAULT_VALIDITY_WINDOW: Duration = Duration::from_secs(300);

    /// Default garbage collection interval.
    pub const DEFAULT_GC_INTERVAL: Duration = Duration::from_secs(10);

    /// Create a cache with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(Self::DEFAULT_VALIDITY_WINDOW, Self::DEFAULT_GC_INTERVAL)
    }

    /// Create a cache with custom settings.
    #[must_use]
    pub fn with_config(validity_window: Duration, gc_interval: Duration) -> Self {
        Self {
            cache: HashMap::new(),
            validity_window,
            last_gc: Instant::now(),
            gc_interval,
        }
    }

    /// Record `id` and report whether this is its first sighting.
    ///
    /// Returns `false` for a repeat within the validity window.
    pub fn first_sighting(&mut self, id: Uuid) -> bool {
        let now = Instant::now();

        if now.duration_since(self.last_gc) > self.gc_interval {
            self.garbage_collect(now);
            self.last_gc = now;
        }

        match self.cache.get(&id) {
            Some(seen_at) if now.duration_since(*seen_at) <= self.validity_window => false,
            _ => {
                self.cache.insert(id, now);
                true
            }
        }
    }

    /// Check if an id is remembered without recording it.
    #[must_use]
    pub fn contains(&self, id: &Uuid) -> bool {
        self.cache.contains_key(id)
    }

    /// Get the number of remembered ids.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Check if the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    fn garbage_collect(&mut self, now: Instant) {
        let window = self.validity_window;
        self.cache
            .retain(|_, seen_at| now.duration_since(*seen_at) <= window);
    }
}

impl Default for TimeBoundedSeenCache {
    fn default() -> Self {
        Self::new()
    }
}
