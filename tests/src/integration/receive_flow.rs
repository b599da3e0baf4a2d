//! # Receive Flow
//!
//! ```text
//! Topic::InboundMessage ──→ EbxmlMessageReceiver ──→ IdempotentReceiver
//!                                                     │          │
//!                                        InboundPayload        OutboundAck
//! ```

use std::sync::Arc;
use std::time::Duration;

use mhs_01_ebxml::{EnvelopeCodec, SoapEnvelopeCodec};
use mhs_03_idempotent_receiver::{
    AckKind, BusPayloadSink, EbxmlAckSender, EbxmlInboundMessage, EbxmlMessageReceiver,
    IdempotentReceiver, InboundDisposition, ReceiveError, ReceiveOutcome, ReceiverConfig,
};
use shared_bus::{InMemoryMessageBus, MessageFilter, Topic, HEADER_SOAP_ACTION};
use shared_types::InMemoryKeyStore;

use super::fixtures::{bus_root_envelope, manifest_message, reply_message, root_envelope};

fn receiver(bus: &Arc<InMemoryMessageBus>) -> EbxmlMessageReceiver {
    let codec: Arc<dyn EnvelopeCodec> = Arc::new(SoapEnvelopeCodec);
    EbxmlMessageReceiver::new(
        IdempotentReceiver::<EbxmlInboundMessage>::new(
            Arc::new(InMemoryKeyStore::new("inbound-seen")),
            Arc::new(BusPayloadSink::new(bus.clone())),
            Arc::new(EbxmlAckSender::new(bus.clone(), codec.clone())),
            ReceiverConfig {
                publish_redeliveries: 1,
                publish_redelivery_delay: Duration::from_millis(5),
            },
        ),
        bus.clone(),
        codec,
    )
}

#[tokio::test]
async fn test_redelivered_message_is_published_once_and_acked_twice() {
    let bus = Arc::new(InMemoryMessageBus::new());
    let mut payloads = bus.subscribe(MessageFilter::topic(Topic::InboundPayload));
    let mut acks = bus.subscribe(MessageFilter::topic(Topic::OutboundAck));
    let receiver = receiver(&bus);

    let message = manifest_message();
    let inbound = message.to_bus_message(Topic::InboundMessage);

    let first = receiver.handle(&inbound).await.unwrap();
    let second = receiver.handle(&inbound).await.unwrap();

    assert_eq!(
        first,
        InboundDisposition::Received(ReceiveOutcome {
            duplicate: false,
            ack: Some(AckKind::Success)
        })
    );
    assert_eq!(
        second,
        InboundDisposition::Received(ReceiveOutcome {
            duplicate: true,
            ack: Some(AckKind::Success)
        })
    );

    let payload = payloads.recv().await.unwrap();
    assert_eq!(payload.correlation_id, Some(message.correlation_id.clone()));
    assert_eq!(payload.header(HEADER_SOAP_ACTION), message.soap_action.as_deref());
    assert!(payloads.try_recv().unwrap().is_none());

    for _ in 0..2 {
        let ack = bus_root_envelope(&acks.recv().await.unwrap());
        assert!(ack.is_acknowledgment());
        assert_eq!(ack.ref_to_message_id(), Some(message.correlation_id.as_str()));
    }
}

#[tokio::test]
async fn test_publish_failure_sends_failure_ack_and_allows_redelivery() {
    let bus = Arc::new(InMemoryMessageBus::new());
    let mut acks = bus.subscribe(MessageFilter::topic(Topic::OutboundAck));
    let receiver = receiver(&bus);

    let message = manifest_message();
    let inbound = message.to_bus_message(Topic::InboundMessage);

    // Nobody consumes InboundPayload yet, so every publish attempt fails.
    let result = receiver.handle(&inbound).await;
    assert!(matches!(
        result,
        Err(ReceiveError::PublishFailed { attempts: 2, .. })
    ));
    let failure = bus_root_envelope(&acks.recv().await.unwrap());
    assert!(failure.is_delivery_failure());
    assert_eq!(failure.ref_to_message_id(), Some(message.correlation_id.as_str()));

    let mut payloads = bus.subscribe(MessageFilter::topic(Topic::InboundPayload));
    let retried = receiver.handle(&inbound).await.unwrap();

    assert_eq!(
        retried,
        InboundDisposition::Received(ReceiveOutcome {
            duplicate: false,
            ack: Some(AckKind::Success)
        })
    );
    assert!(payloads.recv().await.is_some());
    assert!(bus_root_envelope(&acks.recv().await.unwrap()).is_acknowledgment());
}

#[tokio::test]
async fn test_ack_for_us_is_not_acked_back() {
    let bus = Arc::new(InMemoryMessageBus::new());
    let mut replies = bus.subscribe(MessageFilter::topic(Topic::EbxmlAck));
    let mut acks = bus.subscribe(MessageFilter::topic(Topic::OutboundAck));
    let receiver = receiver(&bus);

    let sent = manifest_message();
    let ack = root_envelope(&sent).generate_acknowledgment();

    let disposition = receiver.handle(&reply_message(&ack)).await.unwrap();

    assert_eq!(disposition, InboundDisposition::ForwardedReply);
    let forwarded = replies.recv().await.unwrap();
    assert_eq!(forwarded.correlation_id, Some(sent.correlation_id.clone()));
    assert!(acks.try_recv().unwrap().is_none());
}
