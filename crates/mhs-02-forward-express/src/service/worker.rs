//! Queue workers for the send path.
//!
//! - `OutboundWorker` consumes `Topic::OutboundRequest` and runs each message
//!   through the sender with bounded concurrency.
//! - `AckForwarder` consumes `Topic::OutboundAck` (acks generated by the
//!   receive path) and posts each once. Acks are not themselves acked, so
//!   there is nothing to wait for.

use crate::ports::HttpDelivery;
use crate::service::sender::MultipartMessageSender;
use mhs_01_ebxml::OutboundMessage;
use shared_bus::{BusMessage, Subscription};
use std::sync::Arc;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

pub struct OutboundWorker {
    sender: Arc<MultipartMessageSender>,
    permits: Arc<Semaphore>,
}

impl OutboundWorker {
    /// `concurrency` sends run at once (at least one).
    pub fn new(sender: Arc<MultipartMessageSender>, concurrency: usize) -> Self {
        Self {
            sender,
            permits: Arc::new(Semaphore::new(concurrency.max(1))),
        }
    }

    /// Consume outbound requests until shutdown, then let in-flight sends
    /// finish.
    pub async fn run(&self, mut subscription: Subscription, mut shutdown: watch::Receiver<bool>) {
        let mut tasks = JoinSet::new();

        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                Some(result) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(e) = result {
                        error!(error = %e, "Send task failed");
                    }
                }
                message = subscription.recv() => {
                    let Some(message) = message else { break };
                    let outbound = match OutboundMessage::from_bus_message(&message) {
                        Ok(outbound) => outbound,
                        Err(e) => {
                            warn!(message_id = %message.message_id, error = %e, "Dropping outbound request");
                            continue;
                        }
                    };
                    let Ok(permit) = self.permits.clone().acquire_owned().await else {
                        break;
                    };
                    let sender = self.sender.clone();
                    tasks.spawn(async move {
                        let _permit = permit;
                        let outcome = sender.send(&outbound).await;
                        debug!(
                            correlation_id = %outbound.correlation_id,
                            outcome = ?outcome,
                            "Send finished"
                        );
                        outcome
                    });
                }
            }
        }

        info!(in_flight = tasks.len(), "Outbound worker stopping");
        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                error!(error = %e, "Send task failed");
            }
        }
    }
}

pub struct AckForwarder {
    http: Arc<dyn HttpDelivery>,
}

impl AckForwarder {
    pub fn new(http: Arc<dyn HttpDelivery>) -> Self {
        Self { http }
    }

    /// Post one ack. Returns true when the remote accepted it.
    pub async fn forward(&self, message: &BusMessage) -> bool {
        let outbound = match OutboundMessage::from_bus_message(message) {
            Ok(outbound) => outbound,
            Err(e) => {
                warn!(message_id = %message.message_id, error = %e, "Dropping outbound ack");
                return false;
            }
        };

        match self.http.deliver(&outbound).await {
            Ok(response) if response.is_success() => {
                info!(
                    event = "spine-ack-sent",
                    correlation_id = %outbound.correlation_id,
                    "Ack delivered"
                );
                true
            }
            Ok(response) => {
                warn!(
                    correlation_id = %outbound.correlation_id,
                    status = response.status,
                    "Remote MHS rejected ack"
                );
                false
            }
            Err(e) => {
                warn!(correlation_id = %outbound.correlation_id, error = %e, "Ack delivery failed");
                false
            }
        }
    }

    pub async fn run(&self, mut subscription: Subscription, mut shutdown: watch::Receiver<bool>) {
        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                message = subscription.recv() => {
                    let Some(message) = message else { break };
                    self.forward(&message).await;
                }
            }
        }
        debug!("Ack forwarder stopped");
    }
}
