//! `reqwest` adapter for the `HttpDelivery` port.

use crate::domain::DeliveryError;
use crate::ports::{HttpDelivery, HttpResponse};
use async_trait::async_trait;
use mhs_01_ebxml::OutboundMessage;
use reqwest::header::CONTENT_TYPE;
use shared_bus::HEADER_SOAP_ACTION;
use std::time::Duration;
use tracing::debug;

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Posts outbound messages to a single remote MHS endpoint.
pub struct ReqwestDelivery {
    http_client: reqwest::Client,
    endpoint: String,
}

impl ReqwestDelivery {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_timeout(endpoint, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(endpoint: impl Into<String>, timeout: Duration) -> Self {
        // Use default client if builder fails - reqwest::Client::new() is infallible
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            http_client,
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl HttpDelivery for ReqwestDelivery {
    async fn deliver(&self, message: &OutboundMessage) -> Result<HttpResponse, DeliveryError> {
        let mut request = self
            .http_client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, &message.content_type)
            .body(message.body.clone());
        if let Some(soap_action) = &message.soap_action {
            request = request.header(HEADER_SOAP_ACTION, soap_action);
        }

        let response = request.send().await.map_err(map_error)?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await.map_err(map_error)?;

        debug!(
            correlation_id = %message.correlation_id,
            status = status,
            "Remote MHS responded"
        );

        Ok(HttpResponse {
            status,
            content_type,
            body,
        })
    }
}

fn map_error(error: reqwest::Error) -> DeliveryError {
    if error.is_timeout() {
        DeliveryError::Timeout
    } else {
        DeliveryError::Connection(error.to_string())
    }
}
