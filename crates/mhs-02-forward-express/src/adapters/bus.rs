//! Bus adapter for the `ResponseSink` port.

use crate::domain::{ResponseError, SendResponse};
use crate::ports::ResponseSink;
use async_trait::async_trait;
use shared_bus::{BusMessage, MessagePublisher, Topic, HEADER_SEND_NOTIFICATION};
use std::sync::Arc;
use tracing::info;

/// Publishes definitive outcomes on `Topic::SendResponse`.
pub struct BusResponseSink {
    publisher: Arc<dyn MessagePublisher>,
}

impl BusResponseSink {
    pub fn new(publisher: Arc<dyn MessagePublisher>) -> Self {
        Self { publisher }
    }
}

#[async_trait]
impl ResponseSink for BusResponseSink {
    async fn publish_response(&self, response: SendResponse) -> Result<(), ResponseError> {
        let message = BusMessage::new(Topic::SendResponse, response.body)
            .with_correlation_id(response.correlation_id.clone())
            .with_content_type(response.content_type)
            .with_header(HEADER_SEND_NOTIFICATION, response.notification.as_str());

        self.publisher.publish(message).await?;

        info!(
            correlation_id = %response.correlation_id,
            notification = %response.notification,
            "Published send response"
        );
        Ok(())
    }
}
