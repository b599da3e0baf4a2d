//! Manifest message builder.
//!
//! Wraps an HL7 part and a business (ITK) part into an ebXML manifest
//! message ready for ForwardExpress delivery:
//!
//! ```text
//! part 0  manifest envelope        text/xml (ebXML SOAP envelope)
//! part 1  HL7 wrapper              application/xml; charset=UTF-8
//! part 2  business payload         text/xml
//! ```

use crate::codec::envelope::EnvelopeCodec;
use crate::codec::multipart::{self, related_content_type};
use crate::domain::envelope::{Envelope, ManifestReference};
use crate::domain::errors::BuildError;
use crate::domain::multipart::{MultipartBody, Part};
use crate::domain::outbound::OutboundMessage;
use bytes::Bytes;
use std::sync::Arc;
use tracing::debug;

pub const HL7_CONTENT_TYPE: &str = "application/xml; charset=UTF-8";
pub const BUSINESS_CONTENT_TYPE: &str = "text/xml";
pub const HL7_REFERENCE_DESCRIPTION: &str = "HL7 payload";
pub const BUSINESS_REFERENCE_DESCRIPTION: &str = "ITK payload";

/// Where a message is going.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Destination {
    pub service: String,
    pub action: String,
    pub cpa_id: Option<String>,
    pub to_party: Option<String>,
}

/// Builds outbound manifest messages from a sender prototype.
pub struct ManifestMessageBuilder {
    prototype: Envelope,
    codec: Arc<dyn EnvelopeCodec>,
}

impl ManifestMessageBuilder {
    /// `prototype` supplies sender-side defaults (from party, cpa id, ...).
    pub fn new(prototype: Envelope, codec: Arc<dyn EnvelopeCodec>) -> Self {
        Self { prototype, codec }
    }

    /// Build a manifest message.
    ///
    /// The manifest always requests an acknowledgment and duplicate
    /// elimination; the prototype only fills fields the destination leaves
    /// unset.
    pub fn build(
        &self,
        destination: &Destination,
        hl7_payload: impl Into<Bytes>,
        business_payload: impl Into<Bytes>,
    ) -> Result<OutboundMessage, BuildError> {
        let hl7_part = Part::new(HL7_CONTENT_TYPE, hl7_payload);
        let business_part = Part::new(BUSINESS_CONTENT_TYPE, business_payload);

        let mut manifest = Envelope {
            service: Some(destination.service.clone()),
            action: Some(destination.action.clone()),
            cpa_id: destination.cpa_id.clone(),
            to_party: destination.to_party.clone(),
            ack_requested: true,
            duplicate_elimination: true,
            ..Envelope::default()
        }
        .merged_with(&self.prototype, false)
        .with_defaults();

        manifest.references = vec![
            ManifestReference::to_part(
                hl7_part.content_id.as_deref().unwrap_or_default(),
                true,
                HL7_REFERENCE_DESCRIPTION,
            ),
            ManifestReference::to_part(
                business_part.content_id.as_deref().unwrap_or_default(),
                false,
                BUSINESS_REFERENCE_DESCRIPTION,
            ),
        ];

        let correlation_id = manifest
            .correlation_id()
            .ok_or(BuildError::MissingMessageId)?;

        let manifest_part = Part::new(self.codec.content_type(), self.codec.encode(&manifest)?);
        let start = manifest_part.raw_content_id().unwrap_or_default();

        let body = MultipartBody {
            parts: vec![manifest_part, hl7_part, business_part],
            ..MultipartBody::default()
        };

        debug!(
            correlation_id = %correlation_id,
            soap_action = %manifest.soap_action(),
            "Built manifest message"
        );

        Ok(OutboundMessage {
            correlation_id,
            content_type: related_content_type(&body.boundary, self.codec.content_type(), &start),
            soap_action: Some(manifest.soap_action()),
            body: multipart::encode(&body),
        })
    }
}
