//! HTTP request heads.
//!
//! A [`RequestHead`] is a [`RequestLine`] (method, URI, version) plus the header
//! fields. The URI is kept exactly as received; decoding it is left to the
//! application.

use std::fmt;

use bytes::{BufMut, BytesMut};
use http::Method;

use crate::ensure;
use crate::protocol::header::is_token;
use crate::protocol::{Headers, HttpVersion, MessageHead, ParseError, PayloadSize, StartLine};

/// Head of an HTTP request.
pub type RequestHead = MessageHead<RequestLine>;

/// `METHOD SP URI SP HTTP/major.minor`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    method: Method,
    uri: String,
    version: HttpVersion,
}

impl RequestLine {
    pub fn new(method: Method, uri: impl Into<String>, version: HttpVersion) -> Self {
        Self { method, uri: uri.into(), version }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }
}

impl StartLine for RequestLine {
    fn parse(line: &[u8]) -> Result<Self, ParseError> {
        let mut parts = line.splitn(3, |b| *b == b' ');

        let method = parts.next().unwrap_or_default();
        ensure!(!method.is_empty() && method.iter().all(|b| is_token(*b)), ParseError::InvalidMethod);
        let method = Method::from_bytes(method).map_err(|_| ParseError::InvalidMethod)?;

        let uri = parts.next().ok_or_else(|| ParseError::invalid_start_line("missing request uri"))?;
        ensure!(!uri.is_empty() && uri.iter().all(|b| b.is_ascii_graphic()), ParseError::InvalidUri);
        let uri = String::from_utf8(uri.to_vec()).map_err(|_| ParseError::InvalidUri)?;

        let version = parts.next().ok_or_else(|| ParseError::invalid_start_line("missing http version"))?;
        let version = HttpVersion::parse(version)?;
        // only HTTP/1.x is understood here
        ensure!(version.major() == 1, ParseError::InvalidVersion(version.to_string()));

        Ok(Self { method, uri, version })
    }

    fn encode(&self, dst: &mut BytesMut) {
        let method = self.method.as_str();
        dst.reserve(method.len() + self.uri.len() + 12);
        dst.put_slice(method.as_bytes());
        dst.put_u8(b' ');
        dst.put_slice(self.uri.as_bytes());
        dst.put_u8(b' ');
        dst.put_slice(self.version.to_string().as_bytes());
        dst.put_slice(b"\r\n");
    }

    fn version(&self) -> HttpVersion {
        self.version
    }

    /// Chunked wins over Content-Length; a request with neither has no body,
    /// whatever its method.
    fn payload_size(head: &RequestHead) -> Result<PayloadSize, ParseError> {
        let headers = head.headers();
        if headers.has_transfer_encoding() {
            ensure!(headers.is_chunked(), ParseError::invalid_transfer_encoding("chunked is not applied to the request"));
            return Ok(PayloadSize::Chunked);
        }

        match headers.content_length()? {
            None | Some(0) => Ok(PayloadSize::Empty),
            Some(length) => Ok(PayloadSize::Length(length)),
        }
    }

    fn announces_empty_body(&self) -> bool {
        false
    }
}

impl fmt::Display for RequestLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.method, self.uri, self.version)
    }
}

impl MessageHead<RequestLine> {
    /// Creates a HTTP/1.1 request head without fields.
    pub fn request(method: Method, uri: impl Into<String>) -> Self {
        Self::new(RequestLine::new(method, uri, HttpVersion::HTTP_11), Headers::new())
    }

    pub fn method(&self) -> &Method {
        self.line().method()
    }

    pub fn uri(&self) -> &str {
        self.line().uri()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_request_line() {
        let line = RequestLine::parse(b"GET /index.html?a=1 HTTP/1.1").unwrap();
        assert_eq!(line.method(), &Method::GET);
        assert_eq!(line.uri(), "/index.html?a=1");
        assert_eq!(line.version, HttpVersion::HTTP_11);

        let line = RequestLine::parse(b"PURGE * HTTP/1.0").unwrap();
        assert_eq!(line.method().as_str(), "PURGE");
        assert_eq!(line.uri(), "*");
        assert_eq!(line.version, HttpVersion::HTTP_10);
    }

    #[test]
    fn reject_bad_request_lines() {
        assert!(matches!(RequestLine::parse(b" / HTTP/1.1"), Err(ParseError::InvalidMethod)));
        assert!(matches!(RequestLine::parse(b"GE(T / HTTP/1.1"), Err(ParseError::InvalidMethod)));
        assert!(matches!(RequestLine::parse(b"GET"), Err(ParseError::InvalidStartLine { .. })));
        assert!(matches!(RequestLine::parse(b"GET  HTTP/1.1"), Err(ParseError::InvalidUri)));
        assert!(matches!(RequestLine::parse(b"GET /a\x01 HTTP/1.1"), Err(ParseError::InvalidUri)));
        assert!(matches!(RequestLine::parse(b"GET /a b HTTP/1.1"), Err(ParseError::InvalidVersion(_))));
        assert!(matches!(RequestLine::parse(b"GET / HTTP/2.0"), Err(ParseError::InvalidVersion(_))));
    }

    #[test]
    fn encode_request_line() {
        let mut dst = BytesMut::new();
        RequestLine::new(Method::POST, "/upload", HttpVersion::HTTP_11).encode(&mut dst);
        assert_eq!(&dst[..], b"POST /upload HTTP/1.1\r\n");
    }

    #[test]
    fn request_payload_size() {
        let mut head = RequestHead::request(Method::POST, "/");
        assert_eq!(RequestLine::payload_size(&head).unwrap(), PayloadSize::Empty);

        head.headers_mut().insert("Content-Length", "12").unwrap();
        assert_eq!(RequestLine::payload_size(&head).unwrap(), PayloadSize::Length(12));

        head.headers_mut().insert("Transfer-Encoding", "chunked").unwrap();
        assert_eq!(RequestLine::payload_size(&head).unwrap(), PayloadSize::Chunked);

        head.headers_mut().set("Transfer-Encoding", "gzip").unwrap();
        assert!(RequestLine::payload_size(&head).is_err());
    }

    #[test]
    fn keep_alive_by_version() {
        let mut head = RequestHead::request(Method::GET, "/");
        assert!(head.keep_alive());
        head.headers_mut().insert("Connection", "close").unwrap();
        assert!(!head.keep_alive());

        let mut head = RequestHead::new(RequestLine::new(Method::GET, "/", HttpVersion::HTTP_10), Headers::new());
        assert!(!head.keep_alive());
        head.headers_mut().insert("Connection", "Keep-Alive").unwrap();
        assert!(head.keep_alive());
    }
}
