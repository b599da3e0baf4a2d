//! Bus adapter publishing DTS payloads.

use crate::domain::DtsMessage;
use async_trait::async_trait;
use mhs_03_idempotent_receiver::{InboundMessage, PayloadSink, SinkError};
use shared_bus::{
    BusMessage, MessagePublisher, Topic, HEADER_DTS_CONTROL_FILE, HEADER_DTS_CONTROL_FILE_NAME,
};
use std::sync::Arc;
use tracing::info;

pub const DTS_PAYLOAD_CONTENT_TYPE: &str = "application/octet-stream";

/// Publishes data file contents on `Topic::DtsPayload`; the control file
/// travels in headers.
pub struct DtsBusSink {
    publisher: Arc<dyn MessagePublisher>,
}

impl DtsBusSink {
    pub fn new(publisher: Arc<dyn MessagePublisher>) -> Self {
        Self { publisher }
    }
}

#[async_trait]
impl PayloadSink<DtsMessage> for DtsBusSink {
    async fn publish(&self, message: &DtsMessage) -> Result<(), SinkError> {
        let bus_message = BusMessage::new(Topic::DtsPayload, message.data.clone())
            .with_correlation_id(message.dedup_key())
            .with_content_type(DTS_PAYLOAD_CONTENT_TYPE)
            .with_header(HEADER_DTS_CONTROL_FILE_NAME, message.control_file_name.clone())
            .with_header(HEADER_DTS_CONTROL_FILE, message.raw_control_file.clone());

        self.publisher.publish(bus_message).await?;

        info!(
            event = "dts-payload-published",
            file_name = %message.control_file_name,
            workflow_id = message.control_file.workflow_id.as_deref().unwrap_or_default(),
            "Published DTS payload"
        );
        Ok(())
    }
}
