//! Correlated request / asynchronous-ack exchange.
//!
//! ```text
//! execute(msg)
//!   │ in_progress.add(id) ──(already there)──→ AlreadyInProgress
//!   │ pending.register(id)          ← before the POST: an early ack is kept
//!   │ http.deliver(msg) ──(error / non-2xx)──→ RequestFailed
//!   │ wait(ack_timeout + margin)
//!   ├── ack      → complete = true
//!   └── timeout  → complete = false
//!   (always) in_progress.remove(id), pending entry removed
//! ```

use crate::domain::{ExchangeError, ExchangeOutcome, PendingAckStore};
use crate::ports::HttpDelivery;
use mhs_01_ebxml::OutboundMessage;
use shared_types::{CorrelationId, KeyStore};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Default grace period added to the ack timeout.
pub const DEFAULT_ACK_MARGIN: Duration = Duration::from_secs(1);

pub struct ForwardExpressExchange {
    http: Arc<dyn HttpDelivery>,
    in_progress: Arc<dyn KeyStore>,
    pending: Arc<PendingAckStore>,
    ack_margin: Duration,
}

/// Clears exchange state however `execute` exits, including cancellation.
struct ExchangeGuard<'a> {
    correlation_id: &'a CorrelationId,
    in_progress: &'a dyn KeyStore,
    pending: &'a PendingAckStore,
}

impl Drop for ExchangeGuard<'_> {
    fn drop(&mut self) {
        self.in_progress.remove(self.correlation_id.as_str());
        self.pending.cancel(self.correlation_id);
    }
}

impl ForwardExpressExchange {
    pub fn new(
        http: Arc<dyn HttpDelivery>,
        in_progress: Arc<dyn KeyStore>,
        pending: Arc<PendingAckStore>,
    ) -> Self {
        Self {
            http,
            in_progress,
            pending,
            ack_margin: DEFAULT_ACK_MARGIN,
        }
    }

    pub fn with_ack_margin(mut self, ack_margin: Duration) -> Self {
        self.ack_margin = ack_margin;
        self
    }

    /// Post `message` and wait up to `ack_timeout` (plus margin) for its ack.
    ///
    /// # Errors
    ///
    /// - `AlreadyInProgress` when the correlation id is already being sent
    /// - `RequestFailed` on a connection error or non-2xx response
    pub async fn execute(
        &self,
        message: &OutboundMessage,
        ack_timeout: Duration,
    ) -> Result<ExchangeOutcome, ExchangeError> {
        let correlation_id = &message.correlation_id;

        if !self.in_progress.add(correlation_id.as_str()) {
            return Err(ExchangeError::AlreadyInProgress(correlation_id.clone()));
        }

        let wait = ack_timeout + self.ack_margin;
        let waiter = self.pending.register(correlation_id.clone(), wait);
        let _guard = ExchangeGuard {
            correlation_id,
            in_progress: self.in_progress.as_ref(),
            pending: &self.pending,
        };

        let response = match self.http.deliver(message).await {
            Ok(response) => response,
            Err(error) => {
                warn!(correlation_id = %correlation_id, error = %error, "HTTP delivery failed");
                return Err(ExchangeError::RequestFailed {
                    status: None,
                    content_type: None,
                    body: bytes::Bytes::new(),
                    reason: error.to_string(),
                });
            }
        };

        if !response.is_success() {
            warn!(
                correlation_id = %correlation_id,
                status = response.status,
                "Remote MHS rejected request"
            );
            return Err(ExchangeError::RequestFailed {
                status: Some(response.status),
                content_type: response.content_type,
                body: response.body,
                reason: format!("HTTP status {}", response.status),
            });
        }

        match tokio::time::timeout(wait, waiter).await {
            Ok(Ok(receipt)) => {
                debug!(
                    correlation_id = %correlation_id,
                    response_time_ms = receipt.response_time.as_millis(),
                    "Exchange acknowledged"
                );
                Ok(ExchangeOutcome::acknowledged(receipt.body))
            }
            Ok(Err(_)) | Err(_) => {
                self.pending.expire(correlation_id);
                debug!(
                    correlation_id = %correlation_id,
                    wait_ms = wait.as_millis(),
                    "No ack before timeout"
                );
                Ok(ExchangeOutcome::timed_out())
            }
        }
    }

    /// True while an exchange for `correlation_id` is running.
    pub fn is_in_progress(&self, correlation_id: &CorrelationId) -> bool {
        self.in_progress.contains(correlation_id.as_str())
    }
}
