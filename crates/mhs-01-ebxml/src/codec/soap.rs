//! SOAP rendering of ebXML envelopes.
//!
//! ```text
//! SOAP:Envelope
//! ├── SOAP:Header
//! │   ├── eb:MessageHeader     parties, CPAId, ConversationId, Service,
//! │   │                        Action, MessageData, DuplicateElimination
//! │   ├── eb:AckRequested      present ⇔ ack_requested
//! │   ├── eb:Acknowledgment    present ⇔ acknowledgment
//! │   └── eb:ErrorList         error detail
//! └── SOAP:Body
//!     ├── eb:Manifest          one eb:Reference per part (xlink:href)
//!     └── SOAP:Fault           SOAP faults only
//! ```
//!
//! Elements and attributes are matched by local name when decoding, so any
//! prefix bound to the right namespace is accepted. A body that carries
//! only a `SOAP:Fault` (a synchronous HTTP failure from a remote MHS)
//! decodes to an error envelope built from `faultcode` and `faultstring`.

use crate::codec::envelope::EnvelopeCodec;
use crate::domain::envelope::{
    Envelope, ErrorDetail, ManifestReference, MessageData, SEVERITY_ERROR, TIMESTAMP_FORMAT,
};
use crate::domain::errors::EnvelopeCodecError;
use bytes::Bytes;
use chrono::{DateTime, NaiveDateTime, Utc};
use xmltree::{Element, XMLNode};

pub const SOAP_NAMESPACE: &str = "http://schemas.xmlsoap.org/soap/envelope/";
pub const EBXML_NAMESPACE: &str =
    "http://www.oasis-open.org/committees/ebxml-msg/schema/msg-header-2_0.xsd";
pub const XLINK_NAMESPACE: &str = "http://www.w3.org/1999/xlink";
pub const HL7_EBXML_NAMESPACE: &str = "urn:hl7-org:transport/ebxml/DSTUv1.0";

const PARTY_ID_TYPE: &str = "urn:nhs:names:partyType:ocs+serviceInstance";
const TO_PARTY_ACTOR: &str = "urn:oasis:names:tc:ebxml-msg:actor:toPartyMSH";
const EBXML_VERSION: &str = "2.0";
const DESCRIPTION_LANGUAGE: &str = "en-GB";

/// ebMS 2.0 SOAP rendering (`text/xml`).
#[derive(Debug, Clone, Copy, Default)]
pub struct SoapEnvelopeCodec;

impl SoapEnvelopeCodec {
    pub const CONTENT_TYPE: &'static str = "text/xml";
}

impl EnvelopeCodec for SoapEnvelopeCodec {
    fn content_type(&self) -> &str {
        Self::CONTENT_TYPE
    }

    fn encode(&self, envelope: &Envelope) -> Result<Bytes, EnvelopeCodecError> {
        let mut out = Vec::new();
        render(envelope)
            .write(&mut out)
            .map_err(|e| EnvelopeCodecError::Encode(e.to_string()))?;
        Ok(Bytes::from(out))
    }

    fn decode(&self, data: &[u8]) -> Result<Envelope, EnvelopeCodecError> {
        let root = Element::parse(data).map_err(|e| EnvelopeCodecError::Decode(e.to_string()))?;
        if root.name != "Envelope" {
            return Err(EnvelopeCodecError::Decode(format!(
                "expected a SOAP Envelope, found <{}>",
                root.name
            )));
        }
        read(&root)
    }
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

fn render(envelope: &Envelope) -> Element {
    let mut root = Element::new("SOAP:Envelope");
    for (prefix, namespace) in [
        ("SOAP", SOAP_NAMESPACE),
        ("eb", EBXML_NAMESPACE),
        ("xlink", XLINK_NAMESPACE),
        ("hl7ebxml", HL7_EBXML_NAMESPACE),
    ] {
        set_attr(&mut root, &format!("xmlns:{prefix}"), namespace);
    }

    let timestamp = envelope
        .message_data
        .timestamp
        .map(|timestamp| timestamp.format(TIMESTAMP_FORMAT).to_string());

    let mut header = Element::new("SOAP:Header");
    push(&mut header, message_header(envelope, timestamp.as_deref()));

    if envelope.ack_requested {
        let mut ack_requested = ebxml_block("eb:AckRequested");
        set_attr(&mut ack_requested, "SOAP:actor", TO_PARTY_ACTOR);
        set_attr(&mut ack_requested, "eb:signed", "false");
        push(&mut header, ack_requested);
    }

    if envelope.acknowledgment {
        let mut acknowledgment = ebxml_block("eb:Acknowledgment");
        push_text(&mut acknowledgment, "eb:Timestamp", timestamp.as_deref());
        push_text(
            &mut acknowledgment,
            "eb:RefToMessageId",
            envelope.ref_to_message_id(),
        );
        push(&mut header, acknowledgment);
    }

    if let Some(error) = &envelope.error {
        push(&mut header, error_list(error));
    }
    push(&mut root, header);

    let mut body = Element::new("SOAP:Body");
    if envelope.is_manifest() {
        push(&mut body, manifest(&envelope.references));
    }
    if let Some(error) = envelope.error.as_ref().filter(|_| envelope.is_soap_fault()) {
        push(&mut body, fault(error));
    }
    push(&mut root, body);

    root
}

fn message_header(envelope: &Envelope, timestamp: Option<&str>) -> Element {
    let mut header = ebxml_block("eb:MessageHeader");
    push_party(&mut header, "eb:From", envelope.from_party.as_deref());
    push_party(&mut header, "eb:To", envelope.to_party.as_deref());
    push_text(&mut header, "eb:CPAId", envelope.cpa_id.as_deref());
    push_text(
        &mut header,
        "eb:ConversationId",
        envelope.conversation_id.as_deref(),
    );
    push_text(&mut header, "eb:Service", envelope.service.as_deref());
    push_text(&mut header, "eb:Action", envelope.action.as_deref());

    let mut message_data = Element::new("eb:MessageData");
    push_text(&mut message_data, "eb:MessageId", envelope.message_id());
    push_text(&mut message_data, "eb:Timestamp", timestamp);
    push_text(
        &mut message_data,
        "eb:RefToMessageId",
        envelope.ref_to_message_id(),
    );
    push(&mut header, message_data);

    if envelope.duplicate_elimination {
        push(&mut header, Element::new("eb:DuplicateElimination"));
    }
    header
}

fn error_list(error: &ErrorDetail) -> Element {
    let mut list = ebxml_block("eb:ErrorList");
    set_attr(
        &mut list,
        "eb:highestSeverity",
        error.severity.as_deref().unwrap_or(SEVERITY_ERROR),
    );
    set_optional_attr(&mut list, "eb:id", error.list_id.as_deref());

    let mut item = Element::new("eb:Error");
    set_optional_attr(&mut item, "eb:id", error.id.as_deref());
    set_optional_attr(&mut item, "eb:errorCode", error.code.as_deref());
    set_optional_attr(&mut item, "eb:severity", error.severity.as_deref());
    set_optional_attr(&mut item, "eb:codeContext", error.code_context.as_deref());
    if let Some(description) = &error.description {
        push(&mut item, description_element(description));
    }
    push(&mut list, item);
    list
}

fn fault(error: &ErrorDetail) -> Element {
    let mut fault = Element::new("SOAP:Fault");
    let code = format!("SOAP:{}", error.code.as_deref().unwrap_or_default());
    push_text(&mut fault, "faultcode", Some(&code));
    push_text(&mut fault, "faultstring", error.description.as_deref());
    fault
}

fn manifest(references: &[ManifestReference]) -> Element {
    let mut manifest = ebxml_block("eb:Manifest");
    for reference in references {
        let mut item = Element::new("eb:Reference");
        set_attr(&mut item, "xlink:href", &reference.href);
        if let Some(description) = &reference.description {
            push(&mut item, description_element(description));
        }
        if reference.hl7 {
            let mut payload = Element::new("hl7ebxml:Payload");
            set_attr(&mut payload, "style", "HL7");
            set_attr(&mut payload, "encoding", "XML");
            set_attr(&mut payload, "version", "3.0");
            push(&mut item, payload);
        }
        push(&mut manifest, item);
    }
    manifest
}

fn ebxml_block(name: &str) -> Element {
    let mut element = Element::new(name);
    set_attr(&mut element, "SOAP:mustUnderstand", "1");
    set_attr(&mut element, "eb:version", EBXML_VERSION);
    element
}

fn description_element(description: &str) -> Element {
    let mut element = Element::new("eb:Description");
    set_attr(&mut element, "xml:lang", DESCRIPTION_LANGUAGE);
    element.children.push(XMLNode::Text(description.to_string()));
    element
}

fn push_party(parent: &mut Element, name: &str, party: Option<&str>) {
    if let Some(party) = party.filter(|party| !party.is_empty()) {
        let mut party_id = Element::new("eb:PartyId");
        set_attr(&mut party_id, "eb:type", PARTY_ID_TYPE);
        party_id.children.push(XMLNode::Text(party.to_string()));

        let mut element = Element::new(name);
        push(&mut element, party_id);
        push(parent, element);
    }
}

fn push_text(parent: &mut Element, name: &str, value: Option<&str>) {
    if let Some(value) = value.filter(|value| !value.is_empty()) {
        let mut element = Element::new(name);
        element.children.push(XMLNode::Text(value.to_string()));
        push(parent, element);
    }
}

fn push(parent: &mut Element, child: Element) {
    parent.children.push(XMLNode::Element(child));
}

fn set_attr(element: &mut Element, name: &str, value: &str) {
    element
        .attributes
        .insert(name.to_string(), value.to_string());
}

fn set_optional_attr(element: &mut Element, name: &str, value: Option<&str>) {
    if let Some(value) = value {
        set_attr(element, name, value);
    }
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

fn read(root: &Element) -> Result<Envelope, EnvelopeCodecError> {
    let header = child(root, "Header");
    let body = child(root, "Body");
    let acknowledgment = header.and_then(|header| child(header, "Acknowledgment"));

    let mut envelope = Envelope {
        ack_requested: header
            .and_then(|header| child(header, "AckRequested"))
            .is_some(),
        acknowledgment: acknowledgment.is_some(),
        ..Envelope::default()
    };

    if let Some(message_header) = header.and_then(|header| child(header, "MessageHeader")) {
        envelope.from_party = child(message_header, "From").and_then(|from| child_text(from, "PartyId"));
        envelope.to_party = child(message_header, "To").and_then(|to| child_text(to, "PartyId"));
        envelope.cpa_id = child_text(message_header, "CPAId");
        envelope.conversation_id = child_text(message_header, "ConversationId");
        envelope.service = child_text(message_header, "Service");
        envelope.action = child_text(message_header, "Action");
        envelope.duplicate_elimination = child(message_header, "DuplicateElimination").is_some();

        if let Some(data) = child(message_header, "MessageData") {
            envelope.message_data = MessageData {
                message_id: child_text(data, "MessageId"),
                timestamp: child_text(data, "Timestamp")
                    .map(|raw| parse_timestamp(&raw))
                    .transpose()?,
                ref_to_message_id: child_text(data, "RefToMessageId"),
            };
        }
    }

    if envelope.message_data.ref_to_message_id.is_none() {
        envelope.message_data.ref_to_message_id =
            acknowledgment.and_then(|ack| child_text(ack, "RefToMessageId"));
    }

    envelope.error = header
        .and_then(|header| child(header, "ErrorList"))
        .map(read_error_list)
        .or_else(|| body.and_then(|body| child(body, "Fault")).map(read_fault));

    if let Some(manifest) = body.and_then(|body| child(body, "Manifest")) {
        envelope.references = children(manifest, "Reference").map(read_reference).collect();
    }

    Ok(envelope)
}

fn read_error_list(list: &Element) -> ErrorDetail {
    let item = child(list, "Error");
    ErrorDetail {
        list_id: attribute(list, "id"),
        id: item.and_then(|item| attribute(item, "id")),
        code: item.and_then(|item| attribute(item, "errorCode")),
        severity: item
            .and_then(|item| attribute(item, "severity"))
            .or_else(|| attribute(list, "highestSeverity")),
        code_context: item.and_then(|item| attribute(item, "codeContext")),
        description: item.and_then(|item| child_text(item, "Description")),
    }
}

/// `faultcode` is a QName (`SOAP:Client`); the prefix is dropped.
fn read_fault(fault: &Element) -> ErrorDetail {
    let code = child_text(fault, "faultcode").map(|code| match code.split_once(':') {
        Some((_, local)) => local.to_string(),
        None => code,
    });
    ErrorDetail {
        code,
        severity: Some(SEVERITY_ERROR.to_string()),
        description: child_text(fault, "faultstring"),
        ..ErrorDetail::default()
    }
}

fn read_reference(reference: &Element) -> ManifestReference {
    ManifestReference {
        href: attribute(reference, "href").unwrap_or_default(),
        hl7: child(reference, "Payload").is_some(),
        description: child_text(reference, "Description"),
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, EnvelopeCodecError> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .or_else(|_| DateTime::parse_from_rfc3339(raw).map(|parsed| parsed.with_timezone(&Utc)))
        .map_err(|e| EnvelopeCodecError::Decode(format!("invalid timestamp {raw:?}: {e}")))
}

fn children<'a>(parent: &'a Element, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
    parent.children.iter().filter_map(move |node| match node {
        XMLNode::Element(element) if element.name == name => Some(element),
        _ => None,
    })
}

fn child<'a>(parent: &'a Element, name: &str) -> Option<&'a Element> {
    parent.children.iter().find_map(|node| match node {
        XMLNode::Element(element) if element.name == name => Some(element),
        _ => None,
    })
}

/// Trimmed text and CDATA content of the named child; `None` when blank.
fn child_text(parent: &Element, name: &str) -> Option<String> {
    let element = child(parent, name)?;
    let text: String = element
        .children
        .iter()
        .filter_map(|node| match node {
            XMLNode::Text(text) | XMLNode::CData(text) => Some(text.as_str()),
            _ => None,
        })
        .collect();
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn attribute(element: &Element, name: &str) -> Option<String> {
    element
        .attributes
        .iter()
        .find(|(key, _)| key.rsplit(':').next() == Some(name))
        .map(|(_, value)| value.clone())
}
