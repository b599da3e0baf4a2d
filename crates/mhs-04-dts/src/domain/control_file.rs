//! DTS control file.
//!
//! A control file is a small flat XML document describing the data file
//! delivered next to it:
//!
//! ```xml
//! <DTSControl>
//!   <Version>1.0</Version>
//!   <AddressType>DTS</AddressType>
//!   <MessageType>Data</MessageType>
//!   <WorkflowId>TOC_DISCH_DMS</WorkflowId>
//!   <From_DTS>SENDER01</From_DTS>
//!   <To_DTS>RECEIVER01</To_DTS>
//!   <Subject>...</Subject>
//!   <LocalId>...</LocalId>
//!   <DTSId>...</DTSId>
//! </DTSControl>
//! ```
//!
//! Only the elements the transport routes on are modelled. `MessageType`
//! is required; everything else is optional. Elements are matched by local
//! name, so a namespaced or prefixed control file reads the same; entity
//! references and CDATA are decoded and surrounding whitespace is trimmed.

use crate::domain::errors::DtsError;
use std::fmt;
use xmltree::{Element, EmitterConfig, XMLNode};

const ROOT: &str = "DTSControl";

/// `MessageType` of a control file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DtsMessageType {
    Data,
    Report,
    Other(String),
}

impl DtsMessageType {
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "Data" => Self::Data,
            "Report" => Self::Report,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Data => "Data",
            Self::Report => "Report",
            Self::Other(value) => value,
        }
    }
}

impl fmt::Display for DtsMessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlFile {
    pub version: Option<String>,
    pub address_type: Option<String>,
    pub message_type: DtsMessageType,
    pub workflow_id: Option<String>,
    pub from_dts: Option<String>,
    pub to_dts: Option<String>,
    pub subject: Option<String>,
    pub local_id: Option<String>,
    pub dts_id: Option<String>,
}

impl ControlFile {
    /// A `Data` control file with every optional element unset.
    pub fn data() -> Self {
        Self {
            version: None,
            address_type: None,
            message_type: DtsMessageType::Data,
            workflow_id: None,
            from_dts: None,
            to_dts: None,
            subject: None,
            local_id: None,
            dts_id: None,
        }
    }

    /// Parse a control file. `file_name` only appears in errors.
    ///
    /// # Errors
    ///
    /// `InvalidControlFile` when the document is not well-formed XML, or
    /// the root element or `MessageType` is missing.
    pub fn parse(file_name: &str, xml: &str) -> Result<Self, DtsError> {
        let invalid = |reason: String| DtsError::InvalidControlFile {
            file_name: file_name.to_string(),
            reason,
        };

        let root = Element::parse(xml.as_bytes()).map_err(|e| invalid(e.to_string()))?;
        if root.name != ROOT {
            return Err(invalid(format!("expected DTSControl, found <{}>", root.name)));
        }
        let message_type = child(&root, "MessageType")
            .map(|element| DtsMessageType::parse(&text_of(element)))
            .ok_or_else(|| invalid("missing MessageType".into()))?;

        let text = |name: &str| {
            child(&root, name)
                .map(text_of)
                .filter(|value| !value.is_empty())
        };

        Ok(Self {
            version: text("Version"),
            address_type: text("AddressType"),
            message_type,
            workflow_id: text("WorkflowId"),
            from_dts: text("From_DTS"),
            to_dts: text("To_DTS"),
            subject: text("Subject"),
            local_id: text("LocalId"),
            dts_id: text("DTSId"),
        })
    }

    pub fn is_data(&self) -> bool {
        self.message_type == DtsMessageType::Data
    }

    /// Render back to XML. Unset elements are omitted.
    ///
    /// # Errors
    ///
    /// `Render` if the XML writer fails.
    pub fn to_xml(&self) -> Result<String, DtsError> {
        let mut root = Element::new(ROOT);
        let mut push = |name: &str, value: Option<&str>| {
            if let Some(value) = value {
                let mut element = Element::new(name);
                element.children.push(XMLNode::Text(value.to_string()));
                root.children.push(XMLNode::Element(element));
            }
        };
        push("Version", self.version.as_deref());
        push("AddressType", self.address_type.as_deref());
        push("MessageType", Some(self.message_type.as_str()));
        push("WorkflowId", self.workflow_id.as_deref());
        push("From_DTS", self.from_dts.as_deref());
        push("To_DTS", self.to_dts.as_deref());
        push("Subject", self.subject.as_deref());
        push("LocalId", self.local_id.as_deref());
        push("DTSId", self.dts_id.as_deref());

        let mut out = Vec::new();
        root.write_with_config(&mut out, EmitterConfig::new().perform_indent(true))
            .map_err(|e| DtsError::Render(e.to_string()))?;
        String::from_utf8(out).map_err(|e| DtsError::Render(e.to_string()))
    }
}

fn child<'a>(parent: &'a Element, name: &str) -> Option<&'a Element> {
    parent.children.iter().find_map(|node| match node {
        XMLNode::Element(element) if element.name == name => Some(element),
        _ => None,
    })
}

/// Trimmed text and CDATA content.
fn text_of(element: &Element) -> String {
    let text: String = element
        .children
        .iter()
        .filter_map(|node| match node {
            XMLNode::Text(text) | XMLNode::CData(text) => Some(text.as_str()),
            _ => None,
        })
        .collect();
    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<DTSControl>
  <Version>1.0</Version>
  <AddressType>DTS</AddressType>
  <MessageType>Data</MessageType>
  <WorkflowId>TOC_DISCH_DMS</WorkflowId>
  <From_DTS>SENDER01</From_DTS>
  <To_DTS>RECEIVER01</To_DTS>
  <Subject/>
  <LocalId>a &amp; b</LocalId>
</DTSControl>"#;

    #[test]
    fn test_parse_data_control_file() {
        let control = ControlFile::parse("APP001.ctl", SAMPLE).unwrap();

        assert!(control.is_data());
        assert_eq!(control.workflow_id.as_deref(), Some("TOC_DISCH_DMS"));
        assert_eq!(control.from_dts.as_deref(), Some("SENDER01"));
        assert_eq!(control.to_dts.as_deref(), Some("RECEIVER01"));
        assert_eq!(control.subject, None);
        assert_eq!(control.local_id.as_deref(), Some("a & b"));
        assert_eq!(control.dts_id, None);
    }

    #[test]
    fn test_report_and_other_types() {
        let report = SAMPLE.replace(">Data<", ">Report<");
        let control = ControlFile::parse("APP001.ctl", &report).unwrap();
        assert_eq!(control.message_type, DtsMessageType::Report);
        assert!(!control.is_data());

        assert_eq!(
            DtsMessageType::parse("Status"),
            DtsMessageType::Other("Status".into())
        );
    }

    #[test]
    fn test_missing_message_type_is_invalid() {
        let xml = "<DTSControl><WorkflowId>W</WorkflowId></DTSControl>";
        assert!(matches!(
            ControlFile::parse("x.ctl", xml),
            Err(DtsError::InvalidControlFile { .. })
        ));
        assert!(ControlFile::parse("x.ctl", "not xml").is_err());
        assert!(ControlFile::parse("x.ctl", "<Other><MessageType>Data</MessageType></Other>").is_err());
    }

    #[test]
    fn test_attributes_and_entities() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<DTSControl xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" version="1">
  <Version>1.0</Version>
  <MessageType type="primary">Data</MessageType>
  <WorkflowId>TOC&#95;DISCH&#x5F;DMS</WorkflowId>
  <Subject>&quot;Discharge&quot; &apos;summary&apos; &lt;urgent&gt;</Subject>
  <LocalId xsi:nil="false">a &amp; b</LocalId>
</DTSControl>"#;

        let control = ControlFile::parse("x.ctl", xml).unwrap();

        assert!(control.is_data());
        assert_eq!(control.workflow_id.as_deref(), Some("TOC_DISCH_DMS"));
        assert_eq!(
            control.subject.as_deref(),
            Some(r#""Discharge" 'summary' <urgent>"#)
        );
        assert_eq!(control.local_id.as_deref(), Some("a & b"));
    }

    #[test]
    fn test_cdata_whitespace_and_comments() {
        let xml = "<DTSControl>
  <!-- generated by the DTS client -->
  <MessageType>
      Report
  </MessageType>
  <Subject><![CDATA[A & <B>]]></Subject>
  <From_DTS>   </From_DTS>
</DTSControl>";

        let control = ControlFile::parse("x.ctl", xml).unwrap();

        assert_eq!(control.message_type, DtsMessageType::Report);
        assert_eq!(control.subject.as_deref(), Some("A & <B>"));
        assert_eq!(control.from_dts, None);
    }

    #[test]
    fn test_prefixed_control_file() {
        let xml = r#"<dts:DTSControl xmlns:dts="urn:nhs:dts"><dts:MessageType>Data</dts:MessageType><dts:DTSId>D1</dts:DTSId></dts:DTSControl>"#;

        let control = ControlFile::parse("x.ctl", xml).unwrap();

        assert!(control.is_data());
        assert_eq!(control.dts_id.as_deref(), Some("D1"));
    }

    #[test]
    fn test_to_xml_parses_back() {
        let control = ControlFile {
            workflow_id: Some("W<1>".into()),
            subject: Some("\"quoted\" & 'apostrophes'".into()),
            local_id: Some("L1".into()),
            ..ControlFile::data()
        };
        let parsed = ControlFile::parse("x.ctl", &control.to_xml().unwrap()).unwrap();
        assert_eq!(parsed, control);
    }
}
