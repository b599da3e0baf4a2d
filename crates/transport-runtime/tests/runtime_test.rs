//! # Runtime Integration Tests
//!
//! Start the full runtime on its in-memory bus with a scripted remote MHS
//! and drive the send, receive and DTS paths through it.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use mhs_01_ebxml::codec::{boundary_from_content_type, decode, encode, related_content_type};
use mhs_01_ebxml::{
    Destination, Envelope, EnvelopeCodec, ManifestMessageBuilder, MultipartBody, OutboundMessage,
    SoapEnvelopeCodec,
};
use mhs_02_forward_express::{DeliveryError, HttpDelivery, HttpResponse};
use shared_bus::{
    BusMessage, MessageFilter, MessagePublisher, Topic, HEADER_DTS_CONTROL_FILE_NAME,
    HEADER_SEND_NOTIFICATION,
};
use tokio::sync::mpsc;
use tokio::time::timeout;
use transport_runtime::{ConfigError, TransportConfig, TransportRuntime};

const WAIT: Duration = Duration::from_secs(5);

/// Accepts every POST with 202 and hands the request to the test.
struct RemoteMhs {
    requests: mpsc::UnboundedSender<OutboundMessage>,
}

#[async_trait]
impl HttpDelivery for RemoteMhs {
    async fn deliver(&self, message: &OutboundMessage) -> Result<HttpResponse, DeliveryError> {
        let _ = self.requests.send(message.clone());
        Ok(HttpResponse {
            status: 202,
            content_type: None,
            body: Bytes::new(),
        })
    }
}

fn config() -> TransportConfig {
    TransportConfig {
        spine_url: "http://remote.invalid/reliablemessaging".into(),
        redelivery_delay: 10,
        aggregator_timeout: 2000,
        ..TransportConfig::default()
    }
}

fn runtime(config: TransportConfig) -> (TransportRuntime, mpsc::UnboundedReceiver<OutboundMessage>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let runtime =
        TransportRuntime::with_http(config, Arc::new(RemoteMhs { requests: tx })).unwrap();
    (runtime, rx)
}

fn manifest_message() -> OutboundMessage {
    ManifestMessageBuilder::new(Envelope::default(), Arc::new(SoapEnvelopeCodec))
        .build(
            &Destination {
                service: "urn:nhs:names:services:test".into(),
                action: "COPC_IN000001GB01".into(),
                ..Destination::default()
            },
            "<hl7/>",
            "<itk/>",
        )
        .unwrap()
}

fn root_envelope(message: &OutboundMessage) -> Envelope {
    let boundary = boundary_from_content_type(&message.content_type).unwrap();
    let body = decode(&message.body, &boundary).unwrap();
    SoapEnvelopeCodec.decode(&body.parts[0].body).unwrap()
}

/// Wrap a reply envelope the way a remote MHS posts it back.
fn inbound_reply(envelope: &Envelope) -> BusMessage {
    let mut body = MultipartBody::default();
    let start = body
        .add_part(
            SoapEnvelopeCodec::CONTENT_TYPE,
            SoapEnvelopeCodec.encode(envelope).unwrap(),
        )
        .raw_content_id()
        .unwrap();
    let content_type = related_content_type(&body.boundary, SoapEnvelopeCodec::CONTENT_TYPE, &start);
    BusMessage::new(Topic::InboundMessage, encode(&body)).with_content_type(content_type)
}

#[tokio::test]
async fn test_send_is_acknowledged_through_inbound_channel() {
    let (mut runtime, mut requests) = runtime(config());
    let bus = runtime.bus();
    let mut responses = bus.subscribe(MessageFilter::topic(Topic::SendResponse));
    runtime.start();

    let message = manifest_message();
    bus.publish(message.to_bus_message(Topic::OutboundRequest))
        .await
        .unwrap();

    let posted = timeout(WAIT, requests.recv()).await.unwrap().unwrap();
    assert_eq!(posted.body, message.body);

    let ack = root_envelope(&posted).generate_acknowledgment();
    bus.publish(inbound_reply(&ack)).await.unwrap();

    let response = timeout(WAIT, responses.recv()).await.unwrap().unwrap();
    assert_eq!(response.header(HEADER_SEND_NOTIFICATION), Some("sent"));
    assert_eq!(response.correlation_id, Some(message.correlation_id.clone()));
    assert_eq!(runtime.pending_acks(), 0);

    runtime.shutdown().await;
}

#[tokio::test]
async fn test_inbound_manifest_is_published_and_acked_once() {
    let (mut runtime, mut requests) = runtime(config());
    let bus = runtime.bus();
    let mut payloads = bus.subscribe(MessageFilter::topic(Topic::InboundPayload));
    runtime.start();

    let inbound = manifest_message().to_bus_message(Topic::InboundMessage);
    bus.publish(inbound.clone()).await.unwrap();
    bus.publish(inbound).await.unwrap();

    let payload = timeout(WAIT, payloads.recv()).await.unwrap().unwrap();
    assert_eq!(payload.topic, Topic::InboundPayload);

    // Both copies are acked; only the first is published.
    for _ in 0..2 {
        let ack = timeout(WAIT, requests.recv()).await.unwrap().unwrap();
        assert!(root_envelope(&ack).is_acknowledgment());
    }
    assert!(timeout(Duration::from_millis(200), payloads.recv())
        .await
        .is_err());

    runtime.shutdown().await;
}

#[tokio::test]
async fn test_dts_pair_is_published() {
    let dir = tempfile::tempdir().unwrap();
    let (mut runtime, _requests) = runtime(TransportConfig {
        dts_folder: Some(dir.path().to_path_buf()),
        dts_file_prefix: "SITE01".into(),
        dts_scan_interval: 20,
        data_file_polling_interval: 10,
        ..config()
    });
    let bus = runtime.bus();
    let mut payloads = bus.subscribe(MessageFilter::topic(Topic::DtsPayload));
    runtime.start();

    tokio::fs::write(dir.path().join("SITE01_0001.dat"), b"discharge summary")
        .await
        .unwrap();
    tokio::fs::write(
        dir.path().join("SITE01_0001.ctl"),
        "<DTSControl><MessageType>Data</MessageType></DTSControl>",
    )
    .await
    .unwrap();

    let payload = timeout(WAIT, payloads.recv()).await.unwrap().unwrap();
    assert_eq!(&payload.body[..], b"discharge summary");
    assert_eq!(payload.header(HEADER_DTS_CONTROL_FILE_NAME), Some("SITE01_0001.ctl"));

    runtime.shutdown().await;
    assert!(!dir.path().join("SITE01_0001.ctl").exists());
    assert!(!dir.path().join("SITE01_0001.dat").exists());
}

#[tokio::test]
async fn test_shutdown_lets_in_flight_send_receive_its_ack() {
    let (mut runtime, mut requests) = runtime(config());
    let bus = runtime.bus();
    let mut responses = bus.subscribe(MessageFilter::topic(Topic::SendResponse));
    runtime.start();

    let message = manifest_message();
    bus.publish(message.to_bus_message(Topic::OutboundRequest))
        .await
        .unwrap();
    let posted = timeout(WAIT, requests.recv()).await.unwrap().unwrap();

    let stopping = tokio::spawn(runtime.shutdown());
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!stopping.is_finished());

    // The reply path still runs while the send drains
    let ack = root_envelope(&posted).generate_acknowledgment();
    bus.publish(inbound_reply(&ack)).await.unwrap();

    let response = timeout(WAIT, responses.recv()).await.unwrap().unwrap();
    assert_eq!(response.header(HEADER_SEND_NOTIFICATION), Some("sent"));
    assert_eq!(response.correlation_id, Some(message.correlation_id.clone()));

    timeout(WAIT, stopping).await.unwrap().unwrap();
    assert_eq!(bus.subscribers_for(Topic::InboundMessage), 0);
}

#[tokio::test]
async fn test_expired_inbound_id_is_processed_again() {
    let (mut runtime, _requests) = runtime(TransportConfig {
        dedup_retention: 50,
        dedup_expiry_interval: 20,
        ..config()
    });
    let bus = runtime.bus();
    let mut payloads = bus.subscribe(MessageFilter::topic(Topic::InboundPayload));
    runtime.start();

    let inbound = manifest_message().to_bus_message(Topic::InboundMessage);
    bus.publish(inbound.clone()).await.unwrap();
    timeout(WAIT, payloads.recv()).await.unwrap().unwrap();

    tokio::time::sleep(Duration::from_millis(200)).await;

    bus.publish(inbound).await.unwrap();
    let again = timeout(WAIT, payloads.recv()).await.unwrap().unwrap();
    assert_eq!(again.topic, Topic::InboundPayload);

    runtime.shutdown().await;
}

#[test]
fn test_missing_spine_url_is_rejected() {
    let result = TransportRuntime::new(TransportConfig::default());
    assert!(matches!(result, Err(ConfigError::Invalid(_))));
}
