//! Idempotent receiver.
//!
//! ```text
//! receive(msg)
//!   │ key in flight ──────────→ wait for that delivery, then re-check
//!   │ store.add(key) ── false ──→ duplicate: skip publish, success ack
//!   │ publish (bounded retry)
//!   ├── ok   → success ack
//!   └── err  → store.remove(key), failure ack, PublishFailed
//! ```
//!
//! A duplicate is only acked once the first delivery has published. If that
//! delivery fails the key is unmarked and the waiting copy is processed as a
//! redelivery. Acks go out only when `ack_requested && !is_acknowledgment`.
//! A failed ack is logged and never changes the outcome.

use crate::domain::{AckKind, InboundMessage, ReceiveError, ReceiveOutcome, ReceiverConfig, SinkError};
use crate::ports::{AckSender, PayloadSink};
use parking_lot::Mutex;
use shared_types::KeyStore;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Completion signal of an in-flight delivery: `Some(published)` once done.
type Completion = watch::Receiver<Option<bool>>;

pub struct IdempotentReceiver<M: InboundMessage> {
    store: Arc<dyn KeyStore>,
    in_flight: Mutex<HashMap<String, Completion>>,
    sink: Arc<dyn PayloadSink<M>>,
    acks: Arc<dyn AckSender<M>>,
    config: ReceiverConfig,
}

enum Claim {
    First(watch::Sender<Option<bool>>),
    InFlight(Completion),
    Done,
}

/// Owns the dedup mark while a delivery publishes. Dropping it unfinished
/// (cancelled receive) rolls the mark back.
struct InFlightGuard<'a> {
    store: &'a dyn KeyStore,
    in_flight: &'a Mutex<HashMap<String, Completion>>,
    key: &'a str,
    done: Option<watch::Sender<Option<bool>>>,
}

impl InFlightGuard<'_> {
    fn finish(mut self, published: bool) {
        self.complete(published);
    }

    fn complete(&mut self, published: bool) {
        let Some(done) = self.done.take() else {
            return;
        };
        if !published {
            self.store.remove(self.key);
        }
        self.in_flight.lock().remove(self.key);
        done.send_replace(Some(published));
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.complete(false);
    }
}

impl<M: InboundMessage> IdempotentReceiver<M> {
    pub fn new(
        store: Arc<dyn KeyStore>,
        sink: Arc<dyn PayloadSink<M>>,
        acks: Arc<dyn AckSender<M>>,
        config: ReceiverConfig,
    ) -> Self {
        Self {
            store,
            in_flight: Mutex::new(HashMap::new()),
            sink,
            acks,
            config,
        }
    }

    /// Process `message` at most once per dedup key.
    ///
    /// # Errors
    ///
    /// - `MissingKey` when the message has an empty dedup key
    /// - `PublishFailed` when every publish attempt failed; the key is
    ///   unmarked so a redelivery is processed again
    pub async fn receive(&self, message: &M) -> Result<ReceiveOutcome, ReceiveError> {
        let key = message.dedup_key();
        if key.is_empty() {
            return Err(ReceiveError::MissingKey);
        }

        let done = loop {
            match self.claim(key) {
                Claim::First(done) => break done,
                Claim::InFlight(mut completion) => {
                    debug!(message_id = %key, "Same message in flight, waiting for its outcome");
                    // A dropped sender means the other delivery was cancelled; re-check
                    let _ = completion.wait_for(Option::is_some).await;
                }
                Claim::Done => {
                    info!(message_id = %key, "Duplicate message, skipping publish");
                    let ack = self.acknowledge(message, AckKind::Success).await;
                    return Ok(ReceiveOutcome {
                        duplicate: true,
                        ack,
                    });
                }
            }
        };
        let guard = InFlightGuard {
            store: self.store.as_ref(),
            in_flight: &self.in_flight,
            key,
            done: Some(done),
        };

        let published = self.publish_with_retry(message).await;
        guard.finish(published.is_ok());

        match published {
            Ok(()) => {
                debug!(message_id = %key, "Payload published");
                let ack = self.acknowledge(message, AckKind::Success).await;
                Ok(ReceiveOutcome {
                    duplicate: false,
                    ack,
                })
            }
            Err(source) => {
                warn!(message_id = %key, error = %source, "Publish failed, dedup mark rolled back");
                self.acknowledge(message, AckKind::Failure).await;
                Err(ReceiveError::PublishFailed {
                    key: key.to_string(),
                    attempts: self.config.max_publish_attempts(),
                    source,
                })
            }
        }
    }

    /// Marks `key` unless it is already marked or in flight.
    fn claim(&self, key: &str) -> Claim {
        let mut in_flight = self.in_flight.lock();
        if let Some(completion) = in_flight.get(key) {
            return Claim::InFlight(completion.clone());
        }
        if self.store.add(key) {
            let (done, completion) = watch::channel(None);
            in_flight.insert(key.to_string(), completion);
            Claim::First(done)
        } else {
            Claim::Done
        }
    }

    async fn publish_with_retry(&self, message: &M) -> Result<(), SinkError> {
        let max_attempts = self.config.max_publish_attempts();
        let mut attempt = 1;
        loop {
            match self.sink.publish(message).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt < max_attempts => {
                    debug!(
                        message_id = %message.dedup_key(),
                        attempt = attempt,
                        error = %e,
                        "Publish attempt failed"
                    );
                    attempt += 1;
                    tokio::time::sleep(self.config.publish_redelivery_delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn acknowledge(&self, message: &M, kind: AckKind) -> Option<AckKind> {
        if !message.wants_ack() {
            return None;
        }
        match self.acks.send_ack(message, kind).await {
            Ok(()) => Some(kind),
            Err(e) => {
                warn!(message_id = %message.dedup_key(), ack = ?kind, error = %e, "Failed to send ack");
                None
            }
        }
    }

    /// True when `key` has been processed (or is being processed).
    pub fn has_seen(&self, key: &str) -> bool {
        self.store.contains(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::outbound::{RecordingAckSender, RecordingPayloadSink};
    use shared_types::InMemoryKeyStore;
    use std::time::Duration;

    struct TestMessage {
        key: String,
        ack_requested: bool,
        acknowledgment: bool,
    }

    impl InboundMessage for TestMessage {
        fn dedup_key(&self) -> &str {
            &self.key
        }
        fn ack_requested(&self) -> bool {
            self.ack_requested
        }
        fn is_acknowledgment(&self) -> bool {
            self.acknowledgment
        }
    }

    fn message(key: &str) -> TestMessage {
        TestMessage {
            key: key.into(),
            ack_requested: true,
            acknowledgment: false,
        }
    }

    struct Fixture {
        receiver: IdempotentReceiver<TestMessage>,
        store: Arc<InMemoryKeyStore>,
        sink: Arc<RecordingPayloadSink>,
        acks: Arc<RecordingAckSender>,
    }

    fn fixture_with(sink: RecordingPayloadSink, acks: RecordingAckSender) -> Fixture {
        let store = Arc::new(InMemoryKeyStore::new("seen"));
        let sink = Arc::new(sink);
        let acks = Arc::new(acks);
        let config = ReceiverConfig {
            publish_redeliveries: 2,
            publish_redelivery_delay: Duration::from_millis(1),
        };
        let receiver =
            IdempotentReceiver::<TestMessage>::new(store.clone(), sink.clone(), acks.clone(), config);
        Fixture {
            receiver,
            store,
            sink,
            acks,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(RecordingPayloadSink::default(), RecordingAckSender::default())
    }

    #[tokio::test]
    async fn test_first_sight_publishes_and_acks() {
        let f = fixture();

        let outcome = f.receiver.receive(&message("M1")).await.unwrap();

        assert_eq!(
            outcome,
            ReceiveOutcome {
                duplicate: false,
                ack: Some(AckKind::Success)
            }
        );
        assert_eq!(f.sink.published(), vec!["M1"]);
        assert!(f.receiver.has_seen("M1"));
    }

    #[tokio::test]
    async fn test_duplicate_skips_publish_but_acks() {
        let f = fixture();

        f.receiver.receive(&message("M1")).await.unwrap();
        let outcome = f.receiver.receive(&message("M1")).await.unwrap();

        assert!(outcome.duplicate);
        assert_eq!(outcome.ack, Some(AckKind::Success));
        assert_eq!(f.sink.published().len(), 1);
        assert_eq!(f.acks.acks().len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_same_key_publishes_once() {
        let f = fixture();
        let (a, b) = (message("M1"), message("M1"));

        let (ra, rb) = tokio::join!(f.receiver.receive(&a), f.receiver.receive(&b));

        let duplicates = [ra.unwrap().duplicate, rb.unwrap().duplicate];
        assert_eq!(duplicates.iter().filter(|d| **d).count(), 1);
        assert_eq!(f.sink.published().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_waits_for_in_flight_publish() {
        let f = fixture_with(
            RecordingPayloadSink::default().with_delay(Duration::from_millis(30)),
            RecordingAckSender::default(),
        );
        let (a, b) = (message("M1"), message("M1"));

        let (ra, rb) = tokio::join!(f.receiver.receive(&a), async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            let outcome = f.receiver.receive(&b).await;
            // The duplicate is only answered after the payload went out
            assert_eq!(f.sink.published(), vec!["M1"]);
            outcome
        });

        assert!(!ra.unwrap().duplicate);
        assert_eq!(
            rb.unwrap(),
            ReceiveOutcome {
                duplicate: true,
                ack: Some(AckKind::Success)
            }
        );
        assert_eq!(f.sink.calls(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_of_failing_delivery_is_not_acked_success() {
        let f = fixture_with(
            RecordingPayloadSink::failing(6).with_delay(Duration::from_millis(10)),
            RecordingAckSender::default(),
        );
        let (a, b) = (message("M1"), message("M1"));

        let (ra, rb) = tokio::join!(f.receiver.receive(&a), async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            f.receiver.receive(&b).await
        });

        assert!(matches!(ra, Err(ReceiveError::PublishFailed { .. })));
        // The waiting copy ran its own delivery after the rollback
        assert!(matches!(rb, Err(ReceiveError::PublishFailed { .. })));
        assert_eq!(f.sink.calls(), 6);
        assert!(f.sink.published().is_empty());
        assert!(f
            .acks
            .acks()
            .iter()
            .all(|(_, kind)| *kind == AckKind::Failure));
        assert!(!f.store.contains("M1"));
    }

    #[tokio::test]
    async fn test_waiting_copy_is_processed_after_first_delivery_fails() {
        let f = fixture_with(
            RecordingPayloadSink::failing(3).with_delay(Duration::from_millis(10)),
            RecordingAckSender::default(),
        );
        let (a, b) = (message("M1"), message("M1"));

        let (ra, rb) = tokio::join!(f.receiver.receive(&a), async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            f.receiver.receive(&b).await
        });

        assert!(ra.is_err());
        assert_eq!(
            rb.unwrap(),
            ReceiveOutcome {
                duplicate: false,
                ack: Some(AckKind::Success)
            }
        );
        assert_eq!(f.sink.published(), vec!["M1"]);
        assert_eq!(
            f.acks.acks(),
            vec![
                ("M1".to_string(), AckKind::Failure),
                ("M1".to_string(), AckKind::Success)
            ]
        );
    }

    #[tokio::test]
    async fn test_cancelled_delivery_releases_key() {
        let f = fixture_with(
            RecordingPayloadSink::default().with_delay(Duration::from_millis(50)),
            RecordingAckSender::default(),
        );

        let cancelled =
            tokio::time::timeout(Duration::from_millis(5), f.receiver.receive(&message("M1"))).await;
        assert!(cancelled.is_err());
        assert!(!f.receiver.has_seen("M1"));

        let outcome = f.receiver.receive(&message("M1")).await.unwrap();
        assert!(!outcome.duplicate);
        assert_eq!(f.sink.published(), vec!["M1"]);
    }

    #[tokio::test]
    async fn test_transient_publish_failure_is_retried() {
        let f = fixture_with(RecordingPayloadSink::failing(2), RecordingAckSender::default());

        let outcome = f.receiver.receive(&message("M1")).await.unwrap();

        assert!(!outcome.duplicate);
        assert_eq!(f.sink.calls(), 3);
        assert_eq!(f.sink.published(), vec!["M1"]);
    }

    #[tokio::test]
    async fn test_publish_failure_rolls_back_and_sends_failure_ack() {
        let f = fixture_with(RecordingPayloadSink::failing(3), RecordingAckSender::default());

        let result = f.receiver.receive(&message("M1")).await;

        assert!(matches!(
            result,
            Err(ReceiveError::PublishFailed { attempts: 3, .. })
        ));
        assert!(!f.store.contains("M1"));
        assert_eq!(f.acks.acks(), vec![("M1".to_string(), AckKind::Failure)]);

        // Redelivery is processed again
        let outcome = f.receiver.receive(&message("M1")).await.unwrap();
        assert!(!outcome.duplicate);
        assert_eq!(f.sink.published(), vec!["M1"]);
    }

    #[tokio::test]
    async fn test_no_ack_when_not_requested_or_ack_message() {
        let f = fixture();

        let mut quiet = message("M1");
        quiet.ack_requested = false;
        let mut ack_message = message("M2");
        ack_message.acknowledgment = true;

        assert_eq!(f.receiver.receive(&quiet).await.unwrap().ack, None);
        assert_eq!(f.receiver.receive(&ack_message).await.unwrap().ack, None);
        assert_eq!(f.receiver.receive(&quiet).await.unwrap().ack, None);
        assert!(f.acks.acks().is_empty());
    }

    #[tokio::test]
    async fn test_ack_failure_is_not_propagated() {
        let f = fixture_with(RecordingPayloadSink::default(), RecordingAckSender::failing());

        let outcome = f.receiver.receive(&message("M1")).await.unwrap();

        assert!(!outcome.duplicate);
        assert_eq!(outcome.ack, None);
        assert_eq!(f.acks.acks().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_key_rejected() {
        let f = fixture();
        let result = f.receiver.receive(&message("")).await;
        assert!(matches!(result, Err(ReceiveError::MissingKey)));
        assert_eq!(f.sink.calls(), 0);
    }
}
