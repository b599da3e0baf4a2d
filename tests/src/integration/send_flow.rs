//! # Send Flow
//!
//! ```text
//! MultipartMessageSender ──POST──→ ScriptedRemote
//!          ↑                            │ (reply, later)
//!   PendingAckStore                     ↓
//!          ↑                  Topic::InboundMessage
//!     AckListener ←── EbxmlAck ←── EbxmlMessageReceiver
//! ```
//!
//! The ack reaches the waiting send through the same inbound receiver that
//! handles business messages.

use std::sync::Arc;
use std::time::Duration;

use mhs_01_ebxml::{EnvelopeCodec, SoapEnvelopeCodec};
use mhs_02_forward_express::{
    AckListener, BusResponseSink, ForwardExpressExchange, MultipartMessageSender,
    PendingAckStore, SendOutcome, SenderConfig,
};
use mhs_03_idempotent_receiver::{
    BusPayloadSink, EbxmlAckSender, EbxmlInboundMessage, EbxmlMessageReceiver,
    IdempotentReceiver, ReceiverConfig,
};
use shared_bus::{
    InMemoryMessageBus, MessageFilter, Subscription, Topic, HEADER_SEND_NOTIFICATION,
};
use shared_types::{InMemoryKeyStore, KeyStore};
use tokio::sync::watch;

use super::fixtures::{manifest_message, RemoteReply, ScriptedRemote};

struct SendHarness {
    sender: MultipartMessageSender,
    remote: Arc<ScriptedRemote>,
    in_progress: Arc<InMemoryKeyStore>,
    pending: Arc<PendingAckStore>,
    responses: Subscription,
    _shutdown: watch::Sender<bool>,
}

fn harness(script: Vec<RemoteReply>) -> SendHarness {
    let bus = Arc::new(InMemoryMessageBus::new());
    let codec: Arc<dyn EnvelopeCodec> = Arc::new(SoapEnvelopeCodec);
    let remote = Arc::new(ScriptedRemote::new(bus.clone(), script));
    let in_progress = Arc::new(InMemoryKeyStore::new("exchange-in-progress"));
    let pending = Arc::new(PendingAckStore::new());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let listener = AckListener::new(in_progress.clone(), pending.clone());
    let acks = bus.subscribe(MessageFilter::topic(Topic::EbxmlAck));
    tokio::spawn(async move { listener.run(acks).await });

    let inbound = EbxmlMessageReceiver::new(
        IdempotentReceiver::<EbxmlInboundMessage>::new(
            Arc::new(InMemoryKeyStore::new("inbound-seen")),
            Arc::new(BusPayloadSink::new(bus.clone())),
            Arc::new(EbxmlAckSender::new(bus.clone(), codec.clone())),
            ReceiverConfig::default(),
        ),
        bus.clone(),
        codec.clone(),
    );
    let messages = bus.subscribe(MessageFilter::topic(Topic::InboundMessage));
    tokio::spawn(async move { inbound.run(messages, shutdown_rx).await });

    let exchange = Arc::new(
        ForwardExpressExchange::new(remote.clone(), in_progress.clone(), pending.clone())
            .with_ack_margin(Duration::from_millis(50)),
    );
    let sender = MultipartMessageSender::new(
        exchange,
        Arc::new(BusResponseSink::new(bus.clone())),
        codec,
        SenderConfig {
            maximum_redeliveries: 2,
            redelivery_delay: Duration::from_millis(10),
            ack_timeout: Duration::from_millis(300),
        },
    );

    SendHarness {
        sender,
        remote,
        in_progress,
        pending,
        responses: bus.subscribe(MessageFilter::topic(Topic::SendResponse)),
        _shutdown: shutdown_tx,
    }
}

impl SendHarness {
    async fn next_notification(&mut self) -> (String, mhs_01_ebxml::Envelope) {
        let response = tokio::time::timeout(Duration::from_secs(5), self.responses.recv())
            .await
            .unwrap()
            .unwrap();
        let notification = response.header(HEADER_SEND_NOTIFICATION).unwrap().to_string();
        let envelope = SoapEnvelopeCodec.decode(&response.body).unwrap();
        (notification, envelope)
    }

    fn assert_no_leftover_state(&self) {
        assert!(self.in_progress.is_empty());
        assert_eq!(self.pending.pending_count(), 0);
    }
}

#[tokio::test]
async fn test_ack_on_first_attempt() {
    let mut h = harness(vec![RemoteReply::Ack]);
    let message = manifest_message();

    let outcome = h.sender.send(&message).await;

    assert_eq!(outcome, SendOutcome::Acknowledged { attempts: 1 });
    let (notification, envelope) = h.next_notification().await;
    assert_eq!(notification, "sent");
    assert!(envelope.is_acknowledgment());
    assert_eq!(envelope.ref_to_message_id(), Some(message.correlation_id.as_str()));
    h.assert_no_leftover_state();
}

#[tokio::test]
async fn test_warning_is_retried_with_identical_message() {
    let mut h = harness(vec![RemoteReply::Warning, RemoteReply::Ack]);
    let message = manifest_message();

    let outcome = h.sender.send(&message).await;

    assert_eq!(outcome, SendOutcome::Acknowledged { attempts: 2 });
    let posts = h.remote.posts();
    assert_eq!(posts.len(), 2);
    assert_eq!(posts[0], posts[1]);
    assert_eq!(h.next_notification().await.0, "sent");
    h.assert_no_leftover_state();
}

#[tokio::test]
async fn test_fault_is_terminal() {
    let mut h = harness(vec![RemoteReply::Fault]);

    let outcome = h.sender.send(&manifest_message()).await;

    assert_eq!(outcome, SendOutcome::Rejected { attempts: 1 });
    assert_eq!(h.remote.posts().len(), 1);
    let (notification, envelope) = h.next_notification().await;
    assert_eq!(notification, "send-failed");
    assert!(envelope.is_soap_fault());
}

#[tokio::test]
async fn test_http_fault_is_terminal() {
    let mut h = harness(vec![RemoteReply::HttpFault]);

    let outcome = h.sender.send(&manifest_message()).await;

    assert_eq!(outcome, SendOutcome::Rejected { attempts: 1 });
    let (notification, envelope) = h.next_notification().await;
    assert_eq!(notification, "send-failed");
    assert_eq!(
        envelope.error.and_then(|e| e.description).as_deref(),
        Some("schema validation failed")
    );
    h.assert_no_leftover_state();
}

#[tokio::test]
async fn test_silence_exhausts_redeliveries() {
    let mut h = harness(vec![
        RemoteReply::Silent,
        RemoteReply::Unreachable,
        RemoteReply::Silent,
    ]);
    let message = manifest_message();

    let outcome = h.sender.send(&message).await;

    assert_eq!(outcome, SendOutcome::Exhausted { attempts: 3 });
    assert_eq!(h.remote.posts().len(), 3);
    let (notification, envelope) = h.next_notification().await;
    assert_eq!(notification, "send-failed");
    assert!(envelope.is_delivery_failure());
    assert_eq!(envelope.ref_to_message_id(), Some(message.correlation_id.as_str()));
    h.assert_no_leftover_state();
}

#[tokio::test]
async fn test_silent_attempt_then_ack() {
    let mut h = harness(vec![RemoteReply::Silent, RemoteReply::Ack]);
    let message = manifest_message();

    let outcome = h.sender.send(&message).await;

    assert_eq!(outcome, SendOutcome::Acknowledged { attempts: 2 });
    assert_eq!(h.next_notification().await.0, "sent");
    h.assert_no_leftover_state();
}
