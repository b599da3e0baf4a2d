//! # DTS Flow
//!
//! A DTS folder shared with other consumers: only `<prefix>*.ctl` pairs are
//! picked up, published once, and cleaned up.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use mhs_03_idempotent_receiver::ReceiverConfig;
use mhs_04_dts::{
    ControlFile, DtsBusSink, DtsConfig, DtsDisposition, DtsError, DtsMessageReceiver,
    DtsMessageType, TokioFileStore,
};
use shared_bus::{
    InMemoryMessageBus, MessageFilter, Topic, HEADER_DTS_CONTROL_FILE, HEADER_DTS_CONTROL_FILE_NAME,
};
use shared_types::{InMemoryKeyStore, KeyStore};
use tokio::sync::watch;
use tokio::time::timeout;

const PREFIX: &str = "SITE01APP";

fn dts(folder: &Path, bus: &Arc<InMemoryMessageBus>) -> (Arc<DtsMessageReceiver>, Arc<InMemoryKeyStore>) {
    let processed = Arc::new(InMemoryKeyStore::new("dts-processed"));
    let receiver = DtsMessageReceiver::new(
        Arc::new(TokioFileStore::new(folder)),
        processed.clone(),
        Arc::new(DtsBusSink::new(bus.clone())),
        ReceiverConfig {
            publish_redeliveries: 0,
            publish_redelivery_delay: Duration::from_millis(1),
        },
        DtsConfig {
            file_prefix: PREFIX.into(),
            data_file_polling_interval: Duration::from_millis(10),
            data_file_max_attempts: 20,
            scan_interval: Duration::from_millis(20),
            worker_pool_size: 2,
            ..DtsConfig::default()
        },
    );
    (Arc::new(receiver), processed)
}

fn control_file(workflow_id: &str) -> String {
    ControlFile {
        version: Some("1.0".into()),
        address_type: Some("DTS".into()),
        workflow_id: Some(workflow_id.into()),
        from_dts: Some("SENDER01".into()),
        to_dts: Some("RECEIVER01".into()),
        ..ControlFile::data()
    }
    .to_xml()
    .unwrap()
}

/// Data first, then the control file renamed into place so a scan never
/// sees it half written.
async fn drop_pair(folder: &Path, stem: &str, data: &str) {
    tokio::fs::write(folder.join(format!("{stem}.dat")), data).await.unwrap();
    let staging = folder.join(format!("{stem}.ctl.part"));
    tokio::fs::write(&staging, control_file("TOC_DISCH_DMS"))
        .await
        .unwrap();
    tokio::fs::rename(staging, folder.join(format!("{stem}.ctl")))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_running_receiver_publishes_every_pair_and_ignores_foreign_files() {
    let dir = tempfile::tempdir().unwrap();
    let bus = Arc::new(InMemoryMessageBus::new());
    let mut payloads = bus.subscribe(MessageFilter::topic(Topic::DtsPayload));
    let (receiver, processed) = dts(dir.path(), &bus);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(receiver.clone().run(shutdown_rx));

    for i in 0..4 {
        drop_pair(dir.path(), &format!("{PREFIX}_{i:04}"), &format!("payload {i}")).await;
    }
    drop_pair(dir.path(), "OTHERAPP_0001", "not ours").await;

    let mut bodies = Vec::new();
    for _ in 0..4 {
        let message = timeout(Duration::from_secs(5), payloads.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(message
            .header(HEADER_DTS_CONTROL_FILE)
            .is_some_and(|xml| xml.contains("<WorkflowId>TOC_DISCH_DMS</WorkflowId>")));
        bodies.push(String::from_utf8(message.body.to_vec()).unwrap());
    }
    bodies.sort();
    assert_eq!(bodies, vec!["payload 0", "payload 1", "payload 2", "payload 3"]);

    shutdown_tx.send(true).unwrap();
    handle.await.unwrap();

    assert_eq!(processed.len(), 4);
    for i in 0..4 {
        assert!(!dir.path().join(format!("{PREFIX}_{i:04}.ctl")).exists());
        assert!(!dir.path().join(format!("{PREFIX}_{i:04}.dat")).exists());
    }
    assert!(dir.path().join("OTHERAPP_0001.ctl").exists());
    assert!(dir.path().join("OTHERAPP_0001.dat").exists());
}

#[tokio::test]
async fn test_control_file_before_data_file() {
    let dir = tempfile::tempdir().unwrap();
    let bus = Arc::new(InMemoryMessageBus::new());
    let mut payloads = bus.subscribe(MessageFilter::topic(Topic::DtsPayload));
    let (receiver, _) = dts(dir.path(), &bus);

    let stem = format!("{PREFIX}_LATE");
    tokio::fs::write(dir.path().join(format!("{stem}.ctl")), control_file("W"))
        .await
        .unwrap();
    let data_path = dir.path().join(format!("{stem}.dat"));
    let writer = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        tokio::fs::write(data_path, b"late data").await.unwrap();
    });

    let disposition = receiver
        .process_control_file(&format!("{stem}.ctl"))
        .await
        .unwrap();
    writer.await.unwrap();

    assert_eq!(disposition, DtsDisposition::Published);
    let message = payloads.recv().await.unwrap();
    assert_eq!(&message.body[..], b"late data");
    assert_eq!(
        message.header(HEADER_DTS_CONTROL_FILE_NAME),
        Some(format!("{stem}.ctl").as_str())
    );
}

#[tokio::test]
async fn test_unconsumed_payload_goes_to_error_folder() {
    let dir = tempfile::tempdir().unwrap();
    let bus = Arc::new(InMemoryMessageBus::new());
    let (receiver, processed) = dts(dir.path(), &bus);

    let stem = format!("{PREFIX}_FAIL");
    drop_pair(dir.path(), &stem, "nobody listens").await;

    let result = receiver.process_control_file(&format!("{stem}.ctl")).await;

    assert!(matches!(result, Err(DtsError::Receive(_))));
    assert!(dir.path().join(format!("{stem}.ctl")).exists());
    assert!(dir.path().join("error").join(format!("{stem}.dat")).exists());
    assert!(processed.contains(&format!("{stem}.ctl")));
    assert!(receiver.scan().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_report_control_file_is_left_alone() {
    let dir = tempfile::tempdir().unwrap();
    let bus = Arc::new(InMemoryMessageBus::new());
    let (receiver, _) = dts(dir.path(), &bus);

    let report = ControlFile {
        message_type: DtsMessageType::Report,
        ..ControlFile::data()
    };
    let name = format!("{PREFIX}_RPT.ctl");
    tokio::fs::write(dir.path().join(&name), report.to_xml().unwrap())
        .await
        .unwrap();

    let disposition = receiver.process_control_file(&name).await.unwrap();

    assert_eq!(disposition, DtsDisposition::Skipped(DtsMessageType::Report));
    assert!(dir.path().join(&name).exists());
}
