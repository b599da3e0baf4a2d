//! Pending Ack Store - bridges the HTTP send and the asynchronous ack channel.
//!
//! Maps correlation ids to exchanges waiting for their ebXML acknowledgment.

use bytes::Bytes;
use dashmap::DashMap;
use shared_types::CorrelationId;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// Ack delivered to a waiting exchange.
#[derive(Debug, Clone)]
pub struct AckReceipt {
    /// Correlation ID this ack is for
    pub correlation_id: CorrelationId,
    /// Raw ack envelope
    pub body: Bytes,
    /// Time between registration and completion
    pub response_time: Duration,
}

/// An exchange waiting for its ack
struct PendingAck {
    sender: oneshot::Sender<AckReceipt>,
    created_at: Instant,
    timeout: Duration,
}

/// Statistics for the pending ack store
#[derive(Debug, Default)]
pub struct PendingStats {
    /// Total waiters registered
    pub total_registered: AtomicU64,
    /// Total waiters completed by an ack
    pub total_completed: AtomicU64,
    /// Total waiters that gave up waiting
    pub total_timeouts: AtomicU64,
    /// Total waiters dropped without an ack (HTTP failure, receiver gone)
    pub total_cancelled: AtomicU64,
}

/// Pending ack store.
///
/// Flow:
/// 1. Exchange calls `register()` BEFORE posting, so an ack that overtakes
///    the HTTP response still finds its waiter
/// 2. Exchange posts the message
/// 3. Ack listener receives the ack and calls `complete()`
/// 4. Exchange awaits the receiver or times out and calls `expire()`
pub struct PendingAckStore {
    pending: DashMap<CorrelationId, PendingAck>,
    stats: Arc<PendingStats>,
}

impl PendingAckStore {
    pub fn new() -> Self {
        Self {
            pending: DashMap::new(),
            stats: Arc::new(PendingStats::default()),
        }
    }

    /// Register a waiter and get the receiver its ack will arrive on.
    ///
    /// A previous waiter for the same id is replaced (its receiver sees a
    /// closed channel).
    pub fn register(
        &self,
        correlation_id: CorrelationId,
        timeout: Duration,
    ) -> oneshot::Receiver<AckReceipt> {
        let (tx, rx) = oneshot::channel();

        let waiter = PendingAck {
            sender: tx,
            created_at: Instant::now(),
            timeout,
        };

        debug!(correlation_id = %correlation_id, "Registered ack waiter");
        self.pending.insert(correlation_id, waiter);
        self.stats.total_registered.fetch_add(1, Ordering::Relaxed);

        rx
    }

    /// Complete a waiter with an ack.
    ///
    /// Returns true if a waiter was found and received the ack.
    pub fn complete(&self, correlation_id: &CorrelationId, body: Bytes) -> bool {
        let Some((correlation_id, waiter)) = self.pending.remove(correlation_id) else {
            warn!(
                correlation_id = %correlation_id,
                "Ack for unknown or expired correlation ID"
            );
            return false;
        };

        let response_time = waiter.created_at.elapsed();
        let receipt = AckReceipt {
            correlation_id: correlation_id.clone(),
            body,
            response_time,
        };

        match waiter.sender.send(receipt) {
            Ok(()) => {
                self.stats.total_completed.fetch_add(1, Ordering::Relaxed);
                debug!(
                    correlation_id = %correlation_id,
                    response_time_ms = response_time.as_millis(),
                    "Completed ack waiter"
                );
                true
            }
            Err(_) => {
                self.stats.total_cancelled.fetch_add(1, Ordering::Relaxed);
                debug!(correlation_id = %correlation_id, "Ack waiter receiver dropped");
                false
            }
        }
    }

    /// Remove a waiter that gave up waiting. Counts as a timeout.
    pub fn expire(&self, correlation_id: &CorrelationId) -> bool {
        if self.pending.remove(correlation_id).is_some() {
            self.stats.total_timeouts.fetch_add(1, Ordering::Relaxed);
            true
        } else {
            false
        }
    }

    /// Remove a waiter without an ack (HTTP failure, caller gone).
    pub fn cancel(&self, correlation_id: &CorrelationId) -> bool {
        if self.pending.remove(correlation_id).is_some() {
            self.stats.total_cancelled.fetch_add(1, Ordering::Relaxed);
            true
        } else {
            false
        }
    }

    /// Remove waiters older than their timeout (TTL cleanup).
    ///
    /// Returns the number removed.
    pub fn remove_expired(&self) -> usize {
        let now = Instant::now();
        let mut removed = 0;

        self.pending.retain(|id, waiter| {
            let elapsed = now.duration_since(waiter.created_at);
            if elapsed > waiter.timeout {
                warn!(
                    correlation_id = %id,
                    elapsed_ms = elapsed.as_millis(),
                    timeout_ms = waiter.timeout.as_millis(),
                    "Removing expired ack waiter"
                );
                self.stats.total_timeouts.fetch_add(1, Ordering::Relaxed);
                removed += 1;
                false
            } else {
                true
            }
        });

        removed
    }

    /// Number of exchanges currently waiting
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Check if a correlation ID has a waiter
    pub fn is_pending(&self, correlation_id: &CorrelationId) -> bool {
        self.pending.contains_key(correlation_id)
    }

    pub fn stats(&self) -> &PendingStats {
        &self.stats
    }
}

impl Default for PendingAckStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Background task removing waiters whose exchange vanished without
/// deregistering.
pub async fn cleanup_task(store: Arc<PendingAckStore>, interval: Duration) {
    let mut cleanup_interval = tokio::time::interval(interval);
    cleanup_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        cleanup_interval.tick().await;
        let removed = store.remove_expired();
        if removed > 0 {
            debug!(removed = removed, "Cleaned up expired ack waiters");
        }
    }
}
