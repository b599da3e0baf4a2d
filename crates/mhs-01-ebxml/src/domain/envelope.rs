//! ebXML envelope (SOAP header) model.
//!
//! The envelope is a plain value: merging and defaulting return new
//! envelopes instead of mutating shared prototypes.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use shared_types::CorrelationId;
use std::hash::{Hash, Hasher};

/// Service used on all generated replies.
pub const SERVICE_EBXML_MSG: &str = "urn:oasis:names:tc:ebxml-msg:service";
/// Action of an acknowledgment reply.
pub const ACTION_ACKNOWLEDGMENT: &str = "Acknowledgment";
/// Action of an error reply.
pub const ACTION_MESSAGE_ERROR: &str = "MessageError";
/// Error code for a client fault.
pub const ERROR_CODE_CLIENT: &str = "Client";
/// Error code for a delivery failure notification.
pub const ERROR_CODE_DELIVERY_FAILURE: &str = "DeliveryFailure";
/// Fatal severity.
pub const SEVERITY_ERROR: &str = "Error";
/// Non-fatal severity (the sender may retry).
pub const SEVERITY_WARNING: &str = "Warning";
/// Wire format of envelope timestamps (UTC, second precision).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// ebXML envelope.
///
/// Equality and hashing use `message_data.message_id` only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Envelope {
    pub from_party: Option<String>,
    pub to_party: Option<String>,
    pub cpa_id: Option<String>,
    pub conversation_id: Option<String>,
    pub service: Option<String>,
    pub action: Option<String>,
    pub message_data: MessageData,
    /// Whether the sender asks for an acknowledgment.
    pub ack_requested: bool,
    /// Whether this envelope is itself an acknowledgment.
    pub acknowledgment: bool,
    pub duplicate_elimination: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
    /// Manifest references, in part order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<ManifestReference>,
}

/// Message identification block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MessageData {
    pub message_id: Option<String>,
    #[serde(with = "timestamp_format", skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ref_to_message_id: Option<String>,
}

/// Error detail carried by error messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ErrorDetail {
    pub list_id: Option<String>,
    pub id: Option<String>,
    pub code: Option<String>,
    pub severity: Option<String>,
    pub code_context: Option<String>,
    pub description: Option<String>,
}

/// Reference from the manifest to a payload part.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ManifestReference {
    /// `cid:<content-id>` of the referenced part.
    pub href: String,
    /// Whether the part is the HL7 wrapper.
    pub hl7: bool,
    pub description: Option<String>,
}

impl Default for Envelope {
    fn default() -> Self {
        Self {
            from_party: None,
            to_party: None,
            cpa_id: None,
            conversation_id: None,
            service: None,
            action: None,
            message_data: MessageData::default(),
            ack_requested: true,
            acknowledgment: false,
            duplicate_elimination: false,
            error: None,
            references: Vec::new(),
        }
    }
}

impl PartialEq for Envelope {
    fn eq(&self, other: &Self) -> bool {
        self.message_data.message_id == other.message_data.message_id
    }
}

impl Eq for Envelope {}

impl Hash for Envelope {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.message_data.message_id.hash(state);
    }
}

impl Envelope {
    /// The message id, if set.
    pub fn message_id(&self) -> Option<&str> {
        self.message_data.message_id.as_deref()
    }

    /// The id of the message this one replies to, if set.
    pub fn ref_to_message_id(&self) -> Option<&str> {
        self.message_data.ref_to_message_id.as_deref()
    }

    /// The HTTP `SOAPAction` for this envelope: `service/action`.
    pub fn soap_action(&self) -> String {
        format!(
            "{}/{}",
            self.service.as_deref().unwrap_or_default(),
            self.action.as_deref().unwrap_or_default()
        )
    }

    /// True when an error detail is present.
    pub fn is_error_message(&self) -> bool {
        self.error.is_some()
    }

    /// True for error messages other than delivery failure notifications.
    pub fn is_soap_fault(&self) -> bool {
        self.error
            .as_ref()
            .is_some_and(|error| !error.is_delivery_failure())
    }

    /// True for delivery failure notifications.
    pub fn is_delivery_failure(&self) -> bool {
        self.error
            .as_ref()
            .is_some_and(ErrorDetail::is_delivery_failure)
    }

    /// True when the envelope lists payload references.
    pub fn is_manifest(&self) -> bool {
        !self.references.is_empty()
    }

    /// True for acknowledgment envelopes.
    pub fn is_acknowledgment(&self) -> bool {
        self.acknowledgment
    }

    /// Fill in generated values.
    ///
    /// - `message_id`: new id when unset
    /// - `timestamp`: now (UTC, whole seconds) when unset
    /// - `conversation_id`: the message id when unset
    /// - error `list_id`/`id`: new ids when unset, `severity` defaults to
    ///   `Error`, `code_context` defaults to blank
    #[must_use]
    pub fn with_defaults(mut self) -> Self {
        if is_unset(&self.message_data.message_id) {
            self.message_data.message_id = Some(generate_id());
        }
        if self.message_data.timestamp.is_none() {
            self.message_data.timestamp = Some(Utc::now().trunc_subsecs(0));
        }
        if is_unset(&self.conversation_id) {
            self.conversation_id = self.message_data.message_id.clone();
        }
        if let Some(error) = self.error.take() {
            self.error = Some(error.with_defaults());
        }
        self
    }

    /// Merge values from `prototype` into a copy of this envelope.
    ///
    /// A field is taken from the prototype when the prototype has it set and
    /// either this envelope does not or `overwrite` is true. An empty string
    /// counts as set. Flags are only
    /// copied when `overwrite` is true. The reference list is replaced by
    /// the prototype's when that list is non-empty and this one is empty or
    /// `overwrite` is true.
    #[must_use]
    pub fn merged_with(&self, prototype: &Envelope, overwrite: bool) -> Self {
        let mut merged = self.clone();

        merge_text(&mut merged.from_party, &prototype.from_party, overwrite);
        merge_text(&mut merged.to_party, &prototype.to_party, overwrite);
        merge_text(&mut merged.cpa_id, &prototype.cpa_id, overwrite);
        merge_text(
            &mut merged.conversation_id,
            &prototype.conversation_id,
            overwrite,
        );
        merge_text(&mut merged.service, &prototype.service, overwrite);
        merge_text(&mut merged.action, &prototype.action, overwrite);

        merged.message_data = self
            .message_data
            .merged_with(&prototype.message_data, overwrite);

        if overwrite {
            merged.ack_requested = prototype.ack_requested;
            merged.acknowledgment = prototype.acknowledgment;
            merged.duplicate_elimination = prototype.duplicate_elimination;
        }

        if let Some(prototype_error) = &prototype.error {
            let target = merged.error.take().unwrap_or_default();
            merged.error = Some(target.merged_with(prototype_error, overwrite));
        }

        if !prototype.references.is_empty() && (overwrite || merged.references.is_empty()) {
            merged.references = prototype.references.clone();
        }

        merged
    }

    /// Correlation id of this message (its `message_id`).
    pub fn correlation_id(&self) -> Option<CorrelationId> {
        self.message_id().map(CorrelationId::from)
    }
}

impl MessageData {
    #[must_use]
    fn merged_with(&self, prototype: &MessageData, overwrite: bool) -> Self {
        let mut merged = self.clone();
        merge_text(&mut merged.message_id, &prototype.message_id, overwrite);
        if prototype.timestamp.is_some() && (overwrite || merged.timestamp.is_none()) {
            merged.timestamp = prototype.timestamp;
        }
        merge_text(
            &mut merged.ref_to_message_id,
            &prototype.ref_to_message_id,
            overwrite,
        );
        merged
    }
}

impl ErrorDetail {
    /// Create an error detail with the given code, severity and description.
    pub fn new(code: &str, severity: Option<&str>, description: &str) -> Self {
        Self {
            code: Some(code.to_string()),
            severity: severity.map(str::to_string),
            description: Some(description.to_string()),
            ..Self::default()
        }
    }

    /// Code is `DeliveryFailure` (case-insensitive).
    pub fn is_delivery_failure(&self) -> bool {
        text_eq(&self.code, ERROR_CODE_DELIVERY_FAILURE)
    }

    /// Code is `Client` (case-insensitive).
    pub fn is_client_error(&self) -> bool {
        text_eq(&self.code, ERROR_CODE_CLIENT)
    }

    /// Severity is `Warning` (case-insensitive).
    pub fn is_warning(&self) -> bool {
        text_eq(&self.severity, SEVERITY_WARNING)
    }

    /// Severity is `Error` (case-insensitive).
    pub fn is_error(&self) -> bool {
        text_eq(&self.severity, SEVERITY_ERROR)
    }

    #[must_use]
    fn with_defaults(mut self) -> Self {
        if is_unset(&self.list_id) {
            self.list_id = Some(generate_id());
        }
        if is_unset(&self.id) {
            self.id = Some(generate_id());
        }
        if self.code_context.is_none() {
            self.code_context = Some(String::new());
        }
        if is_unset(&self.severity) {
            self.severity = Some(SEVERITY_ERROR.to_string());
        }
        self
    }

    #[must_use]
    fn merged_with(&self, prototype: &ErrorDetail, overwrite: bool) -> Self {
        let mut merged = self.clone();
        merge_text(&mut merged.list_id, &prototype.list_id, overwrite);
        merge_text(&mut merged.id, &prototype.id, overwrite);
        merge_text(&mut merged.code, &prototype.code, overwrite);
        merge_text(&mut merged.severity, &prototype.severity, overwrite);
        merge_text(&mut merged.code_context, &prototype.code_context, overwrite);
        merge_text(&mut merged.description, &prototype.description, overwrite);
        merged
    }
}

impl ManifestReference {
    /// Reference a part by its logical content id.
    pub fn to_part(content_id: &str, hl7: bool, description: &str) -> Self {
        Self {
            href: format!("cid:{content_id}"),
            hl7,
            description: Some(description.to_string()),
        }
    }

    /// The referenced content id (the `href` without its `cid:` scheme).
    pub fn content_id(&self) -> &str {
        self.href.strip_prefix("cid:").unwrap_or(&self.href)
    }
}

/// Generate an upper-case UUID as used for ebXML ids.
pub fn generate_id() -> String {
    CorrelationId::generate().into_inner()
}

fn is_unset(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, str::is_empty)
}

fn merge_text(target: &mut Option<String>, prototype: &Option<String>, overwrite: bool) {
    if prototype.is_some() && (overwrite || target.is_none()) {
        target.clone_from(prototype);
    }
}

fn text_eq(value: &Option<String>, expected: &str) -> bool {
    value
        .as_deref()
        .is_some_and(|v| v.eq_ignore_ascii_case(expected))
}

mod timestamp_format {
    use super::TIMESTAMP_FORMAT;
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(timestamp) => {
                serializer.serialize_some(&timestamp.format(TIMESTAMP_FORMAT).to_string())
            }
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        raw.filter(|s| !s.is_empty())
            .map(|s| {
                NaiveDateTime::parse_from_str(&s, TIMESTAMP_FORMAT)
                    .map(|naive| naive.and_utc())
                    .map_err(serde::de::Error::custom)
            })
            .transpose()
    }
}
