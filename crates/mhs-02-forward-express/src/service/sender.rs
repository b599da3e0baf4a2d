//! Multipart message sender - the redelivery policy around the exchange.
//!
//! ## Attempt Classification
//!
//! | Attempt result | Outcome |
//! |----------------|---------|
//! | ack, no error | Success: publish ack |
//! | ack, `DeliveryFailure` with severity `Warning` | Retryable |
//! | ack, any other error (SOAP fault, severity `Error`) | Terminal: publish ack |
//! | HTTP failure, body is a SOAP fault with severity `Error` | Terminal: publish body |
//! | any other HTTP failure | Retryable |
//! | no ack before timeout | Retryable |
//!
//! Retries resend the original message unchanged, so the remote's
//! duplicate elimination sees the same message id every time. After
//! `maximum_redeliveries` redeliveries a delivery failure notification
//! derived from the original manifest is published instead. If the manifest
//! cannot be read back, the notification references the correlation id.

use crate::domain::{
    AttemptOutcome, ExchangeError, ExchangeOutcome, ManifestError, Reply, SendNotification,
    SendOutcome, SendResponse, SenderConfig,
};
use crate::ports::ResponseSink;
use crate::service::exchange::ForwardExpressExchange;
use bytes::Bytes;
use mhs_01_ebxml::codec::multipart::{boundary_from_content_type, decode};
use mhs_01_ebxml::{Envelope, EnvelopeCodec, MessageData, OutboundMessage};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Description used for notifications raised after the last redelivery.
pub const REDELIVERIES_EXHAUSTED: &str = "Maximum redelivery attempts exhausted";

pub struct MultipartMessageSender {
    exchange: Arc<ForwardExpressExchange>,
    responses: Arc<dyn ResponseSink>,
    codec: Arc<dyn EnvelopeCodec>,
    config: SenderConfig,
}

impl MultipartMessageSender {
    pub fn new(
        exchange: Arc<ForwardExpressExchange>,
        responses: Arc<dyn ResponseSink>,
        codec: Arc<dyn EnvelopeCodec>,
        config: SenderConfig,
    ) -> Self {
        Self {
            exchange,
            responses,
            codec,
            config,
        }
    }

    pub fn config(&self) -> &SenderConfig {
        &self.config
    }

    /// Send `message` until it is acknowledged, rejected or the redeliveries
    /// run out.
    ///
    /// Never fails: recoverable conditions are retried, definitive outcomes
    /// are published on the response channel.
    pub async fn send(&self, message: &OutboundMessage) -> SendOutcome {
        let max_attempts = self.config.max_attempts();
        let mut attempts = 0;

        loop {
            attempts += 1;
            match self.attempt(message).await {
                AttemptOutcome::Success(reply) => {
                    info!(
                        event = "spine-multipart-message-ack",
                        correlation_id = %message.correlation_id,
                        attempts = attempts,
                        "Message acknowledged"
                    );
                    return match self.publish(message, reply).await {
                        Ok(()) => SendOutcome::Acknowledged { attempts },
                        Err(reason) => SendOutcome::Undeliverable { attempts, reason },
                    };
                }
                AttemptOutcome::Terminal(reply) => {
                    warn!(
                        event = "spine-multipart-message-rejected",
                        correlation_id = %message.correlation_id,
                        attempts = attempts,
                        "Message rejected"
                    );
                    return match self.publish(message, reply).await {
                        Ok(()) => SendOutcome::Rejected { attempts },
                        Err(reason) => SendOutcome::Undeliverable { attempts, reason },
                    };
                }
                AttemptOutcome::Retryable(reason) => {
                    debug!(
                        correlation_id = %message.correlation_id,
                        attempt = attempts,
                        max_attempts = max_attempts,
                        reason = %reason,
                        "Attempt failed"
                    );
                    if attempts >= max_attempts {
                        break;
                    }
                    tokio::time::sleep(self.config.redelivery_delay).await;
                }
            }
        }

        warn!(
            event = "spine-multipart-message-redelivery-exhausted",
            correlation_id = %message.correlation_id,
            attempts = attempts,
            "Redeliveries exhausted"
        );

        let reply = match self.delivery_failure_notification(message) {
            Ok(reply) => reply,
            Err(e) => {
                error!(
                    correlation_id = %message.correlation_id,
                    error = %e,
                    "Cannot build delivery failure notification"
                );
                return SendOutcome::Undeliverable {
                    attempts,
                    reason: e.to_string(),
                };
            }
        };

        match self.publish(message, reply).await {
            Ok(()) => SendOutcome::Exhausted { attempts },
            Err(reason) => SendOutcome::Undeliverable { attempts, reason },
        }
    }

    /// One exchange, classified.
    pub async fn attempt(&self, message: &OutboundMessage) -> AttemptOutcome {
        match self.exchange.execute(message, self.config.ack_timeout).await {
            Ok(ExchangeOutcome {
                complete: true,
                ack_body: Some(body),
            }) => self.classify_ack(body),
            Ok(_) => AttemptOutcome::Retryable("no acknowledgment before timeout".into()),
            Err(ExchangeError::RequestFailed {
                content_type,
                body,
                reason,
                ..
            }) => self.classify_request_failure(content_type, body, reason),
            Err(e @ ExchangeError::AlreadyInProgress(_)) => AttemptOutcome::Retryable(e.to_string()),
        }
    }

    fn classify_ack(&self, body: Bytes) -> AttemptOutcome {
        let envelope = match self.codec.decode(&body) {
            Ok(envelope) => envelope,
            Err(e) => return AttemptOutcome::Retryable(format!("unreadable ack: {e}")),
        };

        let reply = Reply {
            envelope,
            content_type: self.codec.content_type().to_string(),
            body,
        };

        match &reply.envelope.error {
            None => AttemptOutcome::Success(reply),
            Some(detail) if detail.is_delivery_failure() && detail.is_warning() => {
                AttemptOutcome::Retryable(format!(
                    "delivery failure warning from remote: {}",
                    detail.description.as_deref().unwrap_or_default()
                ))
            }
            Some(_) => AttemptOutcome::Terminal(reply),
        }
    }

    fn classify_request_failure(
        &self,
        content_type: Option<String>,
        body: Bytes,
        reason: String,
    ) -> AttemptOutcome {
        let Some(content_type) = content_type else {
            return AttemptOutcome::Retryable(reason);
        };

        match self.decode_reply(&content_type, &body) {
            Some(envelope)
                if envelope.is_soap_fault()
                    && envelope.error.as_ref().is_some_and(|e| e.is_error()) =>
            {
                AttemptOutcome::Terminal(Reply {
                    envelope,
                    content_type,
                    body,
                })
            }
            _ => AttemptOutcome::Retryable(reason),
        }
    }

    /// Decode an HTTP error body: either a bare envelope in the codec's
    /// format or a multipart whose first part is one.
    fn decode_reply(&self, content_type: &str, body: &Bytes) -> Option<Envelope> {
        if self.codec.accepts(content_type) {
            return self.codec.decode(body).ok();
        }
        let boundary = boundary_from_content_type(content_type).ok()?;
        let multipart = decode(body, &boundary).ok()?;
        let root = multipart.first_part()?;
        self.codec.decode(&root.body).ok()
    }

    fn delivery_failure_notification(
        &self,
        message: &OutboundMessage,
    ) -> Result<Reply, ManifestError> {
        let manifest = self.original_manifest(message).unwrap_or_else(|e| {
            warn!(
                correlation_id = %message.correlation_id,
                error = %e,
                "Original manifest unreadable, notifying by correlation id"
            );
            Envelope {
                message_data: MessageData {
                    message_id: Some(message.correlation_id.as_str().to_string()),
                    ..MessageData::default()
                },
                ..Envelope::default()
            }
        });

        let notification = manifest.generate_delivery_failure_notification(REDELIVERIES_EXHAUSTED);
        let body = self.codec.encode(&notification)?;

        Ok(Reply {
            envelope: notification,
            content_type: self.codec.content_type().to_string(),
            body,
        })
    }

    fn original_manifest(&self, message: &OutboundMessage) -> Result<Envelope, ManifestError> {
        let boundary = boundary_from_content_type(&message.content_type)?;
        let multipart = decode(&message.body, &boundary)?;
        let root = multipart
            .first_part()
            .ok_or(ManifestError::MissingManifestPart)?;
        Ok(self.codec.decode(&root.body)?)
    }

    async fn publish(&self, message: &OutboundMessage, reply: Reply) -> Result<(), String> {
        let response = SendResponse {
            correlation_id: message.correlation_id.clone(),
            notification: SendNotification::classify(&reply.envelope),
            content_type: reply.content_type,
            body: reply.body,
        };

        self.responses.publish_response(response).await.map_err(|e| {
            error!(
                correlation_id = %message.correlation_id,
                error = %e,
                "Failed to publish send response"
            );
            e.to_string()
        })
    }
}
