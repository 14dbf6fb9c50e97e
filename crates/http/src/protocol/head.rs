//! The head of a message: its start line and header fields.

use std::fmt;

use bytes::{BufMut, BytesMut};

use crate::protocol::{Headers, HttpVersion, ParseError, PayloadSize};

/// The first line of a message, either a request line or a status line.
///
/// Implementations know how to parse and write themselves and how the body of a
/// message that starts with them is delimited.
pub trait StartLine: Sized + Clone + fmt::Debug + fmt::Display {
    /// Parses a line with its CRLF already stripped.
    fn parse(line: &[u8]) -> Result<Self, ParseError>;

    /// Writes the line including its CRLF.
    fn encode(&self, dst: &mut BytesMut);

    fn version(&self) -> HttpVersion;

    /// Decides the body framing once all header fields are known.
    fn payload_size(head: &MessageHead<Self>) -> Result<PayloadSize, ParseError>;

    /// Whether an empty body is announced with `Content-Length: 0` when encoding.
    fn announces_empty_body(&self) -> bool;
}

/// A start line together with its header fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageHead<L> {
    line: L,
    headers: Headers,
}

impl<L: StartLine> MessageHead<L> {
    pub fn new(line: L, headers: Headers) -> Self {
        Self { line, headers }
    }

    pub fn line(&self) -> &L {
        &self.line
    }

    pub fn line_mut(&mut self) -> &mut L {
        &mut self.line
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    pub fn into_parts(self) -> (L, Headers) {
        (self.line, self.headers)
    }

    pub fn version(&self) -> HttpVersion {
        self.line.version()
    }

    pub fn content_length(&self) -> Result<Option<u64>, ParseError> {
        self.headers.content_length()
    }

    pub fn is_chunked(&self) -> bool {
        self.headers.is_chunked()
    }

    pub fn expects_continue(&self) -> bool {
        self.headers.expects_continue()
    }

    /// Whether the connection may carry another message after this one.
    ///
    /// HTTP/1.1 keeps the connection open unless `Connection: close` is present,
    /// HTTP/1.0 only keeps it open with an explicit `Connection: keep-alive`.
    pub fn keep_alive(&self) -> bool {
        if self.headers.close_requested() {
            return false;
        }
        self.version() >= HttpVersion::HTTP_11 || self.headers.keep_alive_requested()
    }

    /// Writes the start line, the fields and the blank line.
    pub fn encode(&self, dst: &mut BytesMut) {
        self.line.encode(dst);
        self.headers.encode(dst);
        dst.put_slice(b"\r\n");
    }
}

impl<L: StartLine> fmt::Display for MessageHead<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\r\n{}\r\n", self.line, self.headers)
    }
}
