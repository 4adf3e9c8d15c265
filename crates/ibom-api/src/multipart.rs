//! Decoder for `multipart/form-data` request bodies.
//!
//! The body is fully buffered before decoding. Parts are addressed by their
//! `name`; when a name repeats, the later part replaces the earlier one
//! regardless of whether either carried a filename.

use std::collections::HashMap;
use std::io::Cursor;
use std::ops::Range;

use bytes::Bytes;
use ibom_core::AppError;
use thiserror::Error;

/// Framing errors raised while decoding a multipart body.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MultipartError {
    /// The content type carries no usable `boundary` parameter.
    #[error("Missing multipart boundary in content type")]
    MissingBoundary,

    /// A part has no blank line separating its headers from its body.
    #[error("Malformed multipart body: part {index} has no header terminator")]
    MalformedPart {
        /// Zero-based position of the segment in the body.
        index: usize,
    },
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        AppError::malformed(err.to_string())
    }
}

/// An uploaded file part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileField {
    /// Client-supplied filename, unmodified.
    pub filename: String,
    /// Declared `Content-Type` of the part, if any.
    pub content_type: Option<String>,
    /// Part payload.
    pub data: Bytes,
}

impl FileField {
    /// Sequential reader over the payload.
    pub fn reader(&self) -> Cursor<Bytes> {
        Cursor::new(self.data.clone())
    }

    /// Payload size in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// A decoded form part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    /// Scalar value, decoded as UTF-8 with replacement characters.
    Text(String),
    /// File upload.
    File(FileField),
}

/// Decoded form fields keyed by name.
#[derive(Debug, Clone, Default)]
pub struct FormData {
    fields: HashMap<String, Field>,
}

impl FormData {
    /// Field by name.
    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    /// Scalar field by name.
    pub fn text(&self, name: &str) -> Option<&str> {
        match self.fields.get(name)? {
            Field::Text(value) => Some(value),
            Field::File(_) => None,
        }
    }

    /// File field by name.
    pub fn file(&self, name: &str) -> Option<&FileField> {
        match self.fields.get(name)? {
            Field::File(file) => Some(file),
            Field::Text(_) => None,
        }
    }

    /// Number of distinct field names.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether no named part was decoded.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn insert(&mut self, name: String, field: Field) {
        self.fields.insert(name, field);
    }
}

/// Whether a `Content-Type` value names `multipart/form-data`.
pub fn is_form_data(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case("multipart/form-data"))
}

/// Decode a buffered `multipart/form-data` body.
///
/// Either every part is decoded or an error is returned; a partially decoded
/// field set is never produced.
pub fn parse_multipart(body: &Bytes, content_type: &str) -> Result<FormData, MultipartError> {
    let boundary = boundary(content_type).ok_or(MultipartError::MissingBoundary)?;
    let delimiter = format!("--{boundary}");

    let mut form = FormData::default();
    for (index, range) in segments(body, delimiter.as_bytes()).into_iter().enumerate() {
        let segment = &body[range.clone()];
        let trimmed = segment.trim_ascii();
        if trimmed.is_empty() || trimmed == b"--" {
            continue;
        }

        let (head_end, body_start) = find(segment, b"\r\n\r\n")
            .map(|i| (i, i + 4))
            .or_else(|| find(segment, b"\n\n").map(|i| (i, i + 2)))
            .ok_or(MultipartError::MalformedPart { index })?;

        let headers = parse_headers(&segment[..head_end]);
        let Some((name, filename)) = headers
            .get("content-disposition")
            .map(|value| disposition_params(value))
        else {
            continue;
        };
        let Some(name) = name else {
            continue;
        };

        let payload = &segment[body_start..];
        let start = range.start + body_start;
        let data = body.slice(start..start + payload_len(payload));

        let field = match filename {
            Some(filename) => Field::File(FileField {
                filename,
                content_type: headers.get("content-type").cloned(),
                data,
            }),
            None => Field::Text(String::from_utf8_lossy(&data).into_owned()),
        };
        form.insert(name, field);
    }

    Ok(form)
}

/// `boundary` parameter of a content type, unquoted.
fn boundary(content_type: &str) -> Option<&str> {
    content_type
        .split(';')
        .filter_map(|param| param.split_once('='))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("boundary"))
        .map(|(_, value)| value.trim().trim_matches('"'))
        .filter(|value| !value.is_empty())
}

/// Byte ranges between successive delimiters, including the preamble and
/// the trailer.
fn segments(body: &[u8], delimiter: &[u8]) -> Vec<Range<usize>> {
    let mut out = Vec::new();
    let mut start = 0;
    while let Some(i) = find(&body[start..], delimiter) {
        let at = start + i;
        out.push(start..at);
        start = at + delimiter.len();
    }
    out.push(start..body.len());
    out
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn parse_headers(raw: &[u8]) -> HashMap<String, String> {
    String::from_utf8_lossy(raw)
        .lines()
        .filter_map(|line| line.split_once(':'))
        .map(|(key, value)| (key.trim().to_ascii_lowercase(), value.trim().to_string()))
        .collect()
}

/// `name` and `filename` from a `Content-Disposition` value.
fn disposition_params(value: &str) -> (Option<String>, Option<String>) {
    let mut name = None;
    let mut filename = None;
    for param in split_unquoted(value, ';') {
        let Some((key, raw)) = param.split_once('=') else {
            continue;
        };
        let raw = raw.trim();
        let unquoted = raw
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .unwrap_or(raw)
            .to_string();
        match key.trim().to_ascii_lowercase().as_str() {
            "name" => name = Some(unquoted),
            "filename" => filename = Some(unquoted),
            _ => {}
        }
    }
    (name, filename)
}

fn split_unquoted(value: &str, separator: char) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut quoted = false;
    for (i, c) in value.char_indices() {
        if c == '"' {
            quoted = !quoted;
        } else if c == separator && !quoted {
            out.push(&value[start..i]);
            start = i + c.len_utf8();
        }
    }
    out.push(&value[start..]);
    out
}

/// Payload length once the closing marker and line breaks are dropped.
fn payload_len(payload: &[u8]) -> usize {
    let mut data = payload
        .strip_suffix(b"--\r\n")
        .or_else(|| payload.strip_suffix(b"--"))
        .unwrap_or(payload);
    while let [rest @ .., b'\r' | b'\n'] = data {
        data = rest;
    }
    data.len()
}
