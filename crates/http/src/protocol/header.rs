//! HTTP header fields and the ordered collection holding them.
//!
//! [`Headers`] keeps fields in the order they were received (or added), which is
//! also the order they are written back out. Lookups compare names ignoring ASCII
//! case, as header names are case-insensitive on the wire.
//!
//! The collection also derives the facts the rest of the engine cares about:
//! the declared content length, whether the body is chunked, whether the peer asked
//! for the connection to be closed and whether it expects a `100 Continue`.

use std::fmt;

use bytes::{BufMut, BytesMut};
use http::{HeaderName, HeaderValue, header};

use crate::protocol::ParseError;

/// A single `name: value` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderField {
    name: String,
    value: String,
}

impl HeaderField {
    /// Creates a field, trimming surrounding whitespace from the value.
    ///
    /// The name is validated against the token grammar, the value must not contain
    /// control characters other than horizontal tab.
    pub fn new(name: impl Into<String>, value: impl AsRef<str>) -> Result<Self, ParseError> {
        let name = name.into();
        if name.is_empty() || !name.bytes().all(is_token) {
            return Err(ParseError::invalid_header(format!("invalid field name {name:?}")));
        }
        let value = value.as_ref().trim();
        if !value.bytes().all(is_field_value) {
            return Err(ParseError::invalid_header(format!("invalid value for field {name}")));
        }
        Ok(Self { name, value: value.to_owned() })
    }

    /// Builds a field from an already validated name and value.
    pub fn from_typed(name: &HeaderName, value: &HeaderValue) -> Self {
        Self {
            name: name.as_str().to_owned(),
            value: String::from_utf8_lossy(value.as_bytes()).trim().to_owned(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Case-insensitive name comparison.
    #[inline]
    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    /// Appends a folded continuation line to the value.
    pub(crate) fn append_continuation(&mut self, continuation: &str) {
        if continuation.is_empty() {
            return;
        }
        if !self.value.is_empty() {
            self.value.push(' ');
        }
        self.value.push_str(continuation);
    }
}

impl fmt::Display for HeaderField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.value)
    }
}

/// Ordered multimap of header fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    fields: Vec<HeaderField>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { fields: Vec::with_capacity(capacity) }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HeaderField> {
        self.fields.iter()
    }

    pub fn add(&mut self, field: HeaderField) {
        self.fields.push(field);
    }

    /// Appends a field, keeping any existing fields with the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl AsRef<str>) -> Result<(), ParseError> {
        self.add(HeaderField::new(name, value)?);
        Ok(())
    }

    /// Replaces every field called `name` with a single one, appended at the end
    /// if none existed before.
    pub fn set(&mut self, name: &str, value: impl AsRef<str>) -> Result<(), ParseError> {
        self.set_field(HeaderField::new(name, value)?);
        Ok(())
    }

    /// Like [`set`](Self::set) for a field that is already validated.
    pub fn set_field(&mut self, field: HeaderField) {
        let name = field.name.clone();
        match self.fields.iter().position(|f| f.is(&name)) {
            Some(index) => {
                self.fields[index] = field;
                let mut position = 0;
                self.fields.retain(|f| {
                    let keep = position <= index || !f.is(&name);
                    position += 1;
                    keep
                });
            }
            None => self.fields.push(field),
        }
    }

    /// Sets `Connection: close`, replacing any other connection option.
    pub fn set_close(&mut self) {
        self.set_field(HeaderField { name: "Connection".to_owned(), value: "close".to_owned() });
    }

    /// Removes every field called `name`, returning how many were dropped.
    pub fn remove(&mut self, name: &str) -> usize {
        let before = self.fields.len();
        self.fields.retain(|f| !f.is(name));
        before - self.fields.len()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.is(name))
    }

    /// Value of the first field called `name`.
    pub fn find(&self, name: &str) -> Option<&str> {
        self.fields.iter().find(|f| f.is(name)).map(HeaderField::value)
    }

    /// Values of every field called `name`, in order.
    pub fn find_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.fields.iter().filter(move |f| f.is(name)).map(HeaderField::value)
    }

    pub(crate) fn last_mut(&mut self) -> Option<&mut HeaderField> {
        self.fields.last_mut()
    }

    /// Comma separated elements of every field called `name`.
    fn elements<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.find_all(name).flat_map(|value| value.split(',')).map(str::trim).filter(|e| !e.is_empty())
    }

    /// The declared body length.
    ///
    /// Repeated Content-Length fields (or comma separated lists) are accepted only
    /// when every value is identical.
    pub fn content_length(&self) -> Result<Option<u64>, ParseError> {
        let mut length = None;
        for element in self.elements(header::CONTENT_LENGTH.as_str()) {
            if !element.bytes().all(|b| b.is_ascii_digit()) {
                return Err(ParseError::invalid_content_length(format!("value {element} is not u64")));
            }
            let value = element
                .parse::<u64>()
                .map_err(|e| ParseError::invalid_content_length(format!("value {element}: {e}")))?;
            match length {
                Some(previous) if previous != value => {
                    return Err(ParseError::invalid_content_length(format!(
                        "conflicting values {previous} and {value}"
                    )));
                }
                _ => length = Some(value),
            }
        }

        // a Content-Length field holding only separators
        if length.is_none() && self.contains(header::CONTENT_LENGTH.as_str()) {
            return Err(ParseError::invalid_content_length("empty value"));
        }
        Ok(length)
    }

    /// Whether any Transfer-Encoding coding is `chunked`.
    pub fn is_chunked(&self) -> bool {
        self.elements(header::TRANSFER_ENCODING.as_str()).any(|coding| coding.eq_ignore_ascii_case("chunked"))
    }

    pub fn has_transfer_encoding(&self) -> bool {
        self.contains(header::TRANSFER_ENCODING.as_str())
    }

    /// Whether the Connection field carries the `close` option.
    pub fn close_requested(&self) -> bool {
        self.has_connection_option("close")
    }

    /// Whether the Connection field carries the `keep-alive` option.
    pub fn keep_alive_requested(&self) -> bool {
        self.has_connection_option("keep-alive")
    }

    fn has_connection_option(&self, option: &str) -> bool {
        self.elements(header::CONNECTION.as_str()).any(|e| e.eq_ignore_ascii_case(option))
    }

    /// Whether any Expect field is `100-continue`.
    ///
    /// Duplicate Expect fields are tolerated.
    pub fn expects_continue(&self) -> bool {
        self.find_all(header::EXPECT.as_str()).any(|value| value.eq_ignore_ascii_case("100-continue"))
    }

    /// Writes the fields as `Name: value\r\n` lines, without the terminating blank line.
    pub fn encode(&self, dst: &mut BytesMut) {
        for field in &self.fields {
            dst.reserve(field.name.len() + field.value.len() + 4);
            dst.put_slice(field.name.as_bytes());
            dst.put_slice(b": ");
            dst.put_slice(field.value.as_bytes());
            dst.put_slice(b"\r\n");
        }
    }
}

impl<'a> IntoIterator for &'a Headers {
    type Item = &'a HeaderField;
    type IntoIter = std::slice::Iter<'a, HeaderField>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for field in &self.fields {
            write!(f, "{field}\r\n")?;
        }
        Ok(())
    }
}

/// Token characters as defined by RFC 9110 section 5.6.2.
#[inline]
pub(crate) fn is_token(b: u8) -> bool {
    matches!(b,
        b'!' | b'#' | b'$' | b'%' | b'&' | b'\'' | b'*' | b'+' | b'-' | b'.' | b'^' | b'_' | b'`' | b'|' | b'~'
        | b'0'..=b'9' | b'a'..=b'z' | b'A'..=b'Z')
}

/// Visible characters, spaces, tabs and obs-text.
#[inline]
pub(crate) fn is_field_value(b: u8) -> bool {
    b == b'\t' || (b >= 0x20 && b != 0x7f)
}
