//! Byte-exact `multipart/related` codec.
//!
//! ## Layout
//!
//! ```text
//! preamble
//! [CRLF]                     ← only if something precedes the delimiter
//! --boundary CRLF
//! Content-Id: <id> CRLF      ← each header only when present
//! Content-Type: ... CRLF
//! Content-Transfer-Encoding: ... CRLF
//! CRLF
//! body
//! CRLF --boundary CRLF       ← next part ...
//! ...
//! CRLF --boundary-- CRLF
//! epilogue
//! ```
//!
//! Decoding is the exact inverse, with case-insensitive header names and a
//! tolerated missing CRLF after the close delimiter.

use crate::domain::errors::MultipartError;
use crate::domain::multipart::{normalize_content_id, MultipartBody, Part};
use bytes::{BufMut, Bytes, BytesMut};

const CRLF: &[u8] = b"\r\n";
const DASHES: &[u8] = b"--";

pub const HEADER_CONTENT_ID: &str = "Content-Id";
pub const HEADER_CONTENT_TYPE: &str = "Content-Type";
pub const HEADER_CONTENT_TRANSFER_ENCODING: &str = "Content-Transfer-Encoding";

/// Serialize a multipart body.
pub fn encode(body: &MultipartBody) -> Bytes {
    let delimiter = delimiter(&body.boundary);
    let mut out = BytesMut::new();

    out.put_slice(body.preamble.as_bytes());

    let mut crlf_before_delimiter = !body.preamble.is_empty();
    for part in &body.parts {
        if crlf_before_delimiter {
            out.put_slice(CRLF);
        }
        out.put_slice(&delimiter);
        out.put_slice(CRLF);
        encode_part(part, &mut out);
        crlf_before_delimiter = true;
    }

    out.put_slice(CRLF);
    out.put_slice(&delimiter);
    out.put_slice(DASHES);
    out.put_slice(CRLF);
    out.put_slice(body.epilogue.as_bytes());

    out.freeze()
}

fn encode_part(part: &Part, out: &mut BytesMut) {
    if let Some(raw_id) = part.raw_content_id() {
        put_header(out, HEADER_CONTENT_ID, &raw_id);
    }
    if let Some(content_type) = &part.content_type {
        put_header(out, HEADER_CONTENT_TYPE, content_type);
    }
    if let Some(encoding) = &part.content_transfer_encoding {
        put_header(out, HEADER_CONTENT_TRANSFER_ENCODING, encoding);
    }
    out.put_slice(CRLF);
    out.put_slice(&part.body);
}

fn put_header(out: &mut BytesMut, name: &str, value: &str) {
    out.put_slice(name.as_bytes());
    out.put_slice(b": ");
    out.put_slice(value.as_bytes());
    out.put_slice(CRLF);
}

/// Parse a multipart body delimited by `boundary`.
///
/// # Errors
///
/// - `MultipartError::MissingBoundary` when no delimiter is present
/// - `MultipartError::Truncated` when a part or the close delimiter is cut off
/// - `MultipartError::MalformedHeader` for an unparsable header line
pub fn decode(data: &Bytes, boundary: &str) -> Result<MultipartBody, MultipartError> {
    let delimiter = delimiter(boundary);
    let mut separator = CRLF.to_vec();
    separator.extend_from_slice(&delimiter);

    let mut body = MultipartBody::new(boundary);

    // Position of the first delimiter and the preamble before it.
    let mut position = if data.starts_with(&delimiter) {
        0
    } else {
        let index = find(data, &separator, 0).ok_or_else(|| MultipartError::MissingBoundary {
            boundary: boundary.to_string(),
        })?;
        body.preamble = lossy(&data[..index]);
        index + CRLF.len()
    };

    loop {
        let after_delimiter = position + delimiter.len();
        let rest = &data[after_delimiter..];

        if rest.starts_with(DASHES) {
            let tail = &rest[DASHES.len()..];
            let epilogue = tail.strip_prefix(CRLF).unwrap_or(tail);
            body.epilogue = lossy(epilogue);
            return Ok(body);
        }

        if !rest.starts_with(CRLF) {
            return Err(MultipartError::Truncated(
                "delimiter not followed by CRLF".to_string(),
            ));
        }

        let part_start = after_delimiter + CRLF.len();
        let part_end = find(data, &separator, part_start).ok_or_else(|| {
            MultipartError::Truncated(format!("part {} has no closing delimiter", body.parts.len()))
        })?;

        body.parts.push(decode_part(data.slice(part_start..part_end))?);
        position = part_end + CRLF.len();
    }
}

fn decode_part(data: Bytes) -> Result<Part, MultipartError> {
    let mut part = Part::default();
    let mut offset = 0;

    loop {
        if data[offset..].starts_with(CRLF) {
            part.body = data.slice(offset + CRLF.len()..);
            return Ok(part);
        }

        let line_end = find(&data, CRLF, offset)
            .ok_or_else(|| MultipartError::Truncated("part headers not terminated".to_string()))?;
        let line = lossy(&data[offset..line_end]);
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| MultipartError::MalformedHeader(line.clone()))?;
        let value = value.trim().to_string();

        if name.trim().eq_ignore_ascii_case(HEADER_CONTENT_ID) {
            part.content_id = Some(normalize_content_id(&value).to_string());
        } else if name.trim().eq_ignore_ascii_case(HEADER_CONTENT_TYPE) {
            part.content_type = Some(value);
        } else if name
            .trim()
            .eq_ignore_ascii_case(HEADER_CONTENT_TRANSFER_ENCODING)
        {
            part.content_transfer_encoding = Some(value);
        }

        offset = line_end + CRLF.len();
    }
}

/// Extract the `boundary` parameter from a `multipart/*` Content-Type.
///
/// # Errors
///
/// `MultipartError::NoBoundaryParameter` when the type is not multipart or
/// carries no boundary.
pub fn boundary_from_content_type(content_type: &str) -> Result<String, MultipartError> {
    let mut segments = content_type.split(';');
    let media_type = segments.next().unwrap_or_default().trim();
    if !media_type.to_ascii_lowercase().starts_with("multipart/") {
        return Err(MultipartError::NoBoundaryParameter(content_type.to_string()));
    }

    segments
        .filter_map(|segment| segment.split_once('='))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("boundary"))
        .map(|(_, value)| value.trim().trim_matches('"').to_string())
        .filter(|boundary| !boundary.is_empty())
        .ok_or_else(|| MultipartError::NoBoundaryParameter(content_type.to_string()))
}

/// Build the HTTP Content-Type of an ebXML `multipart/related` message.
///
/// `start` is the raw content id of the root part.
pub fn related_content_type(boundary: &str, root_type: &str, start: &str) -> String {
    format!("multipart/related; boundary=\"{boundary}\"; type=\"{root_type}\"; start=\"{start}\"")
}

fn delimiter(boundary: &str) -> Vec<u8> {
    let mut delimiter = DASHES.to_vec();
    delimiter.extend_from_slice(boundary.as_bytes());
    delimiter
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from > haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|index| index + from)
}

fn lossy(data: &[u8]) -> String {
    String::from_utf8_lossy(data).into_owned()
}
