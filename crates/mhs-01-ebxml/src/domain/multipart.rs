//! `multipart/related` body model.

use crate::domain::envelope::generate_id;
use bytes::Bytes;

/// Boundary used when none is given.
pub const DEFAULT_BOUNDARY: &str = "--=_MIME-Boundary";
/// Transfer encoding given to parts created with `add_part`.
pub const DEFAULT_CONTENT_TRANSFER_ENCODING: &str = "8bit";

/// A multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartBody {
    pub boundary: String,
    pub preamble: String,
    pub parts: Vec<Part>,
    pub epilogue: String,
}

/// A single body part.
///
/// `content_id` holds the logical id; the `Content-Id` header carries the
/// raw form `<id>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Part {
    pub content_id: Option<String>,
    pub content_type: Option<String>,
    pub content_transfer_encoding: Option<String>,
    pub body: Bytes,
}

impl Default for MultipartBody {
    fn default() -> Self {
        Self::new(DEFAULT_BOUNDARY)
    }
}

impl MultipartBody {
    /// Empty body with the given boundary.
    pub fn new(boundary: impl Into<String>) -> Self {
        Self {
            boundary: boundary.into(),
            preamble: String::new(),
            parts: Vec::new(),
            epilogue: String::new(),
        }
    }

    /// Append a part with a generated content id and the default transfer
    /// encoding. Returns the new part.
    pub fn add_part(&mut self, content_type: &str, body: impl Into<Bytes>) -> &Part {
        let part = Part::new(content_type, body);
        self.parts.push(part);
        &self.parts[self.parts.len() - 1]
    }

    /// Find a part by logical content id (`id`, `<id>` or `cid:id`).
    pub fn find_part_by_content_id(&self, content_id: &str) -> Option<&Part> {
        let wanted = raw_content_id(normalize_content_id(content_id));
        self.find_part_by_raw_content_id(&wanted)
    }

    /// Find a part by raw content id (`<id>`).
    pub fn find_part_by_raw_content_id(&self, raw_content_id: &str) -> Option<&Part> {
        self.parts
            .iter()
            .find(|part| part.raw_content_id().as_deref() == Some(raw_content_id))
    }

    /// The first part, which carries the ebXML envelope.
    pub fn first_part(&self) -> Option<&Part> {
        self.parts.first()
    }
}

impl Part {
    /// Part with a generated content id and the default transfer encoding.
    pub fn new(content_type: &str, body: impl Into<Bytes>) -> Self {
        Self {
            content_id: Some(generate_id()),
            content_type: Some(content_type.to_string()),
            content_transfer_encoding: Some(DEFAULT_CONTENT_TRANSFER_ENCODING.to_string()),
            body: body.into(),
        }
    }

    /// The `Content-Id` header value: `<id>`.
    pub fn raw_content_id(&self) -> Option<String> {
        self.content_id.as_deref().map(raw_content_id)
    }
}

/// Wrap a logical content id in angle brackets.
pub fn raw_content_id(content_id: &str) -> String {
    format!("<{content_id}>")
}

/// Strip a `cid:` scheme and angle brackets from a content id.
pub fn normalize_content_id(content_id: &str) -> &str {
    let trimmed = content_id.trim();
    let trimmed = trimmed.strip_prefix("cid:").unwrap_or(trimmed);
    trimmed
        .strip_prefix('<')
        .and_then(|s| s.strip_suffix('>'))
        .unwrap_or(trimmed)
}
