//! HTTP response heads.
//!
//! A [`ResponseHead`] is a [`StatusLine`] plus header fields. Heads built locally
//! take their reason phrase from the canonical status table of the `http` crate;
//! parsed heads keep the phrase the peer sent.

use std::fmt;

use bytes::{BufMut, BytesMut};
use http::{HeaderName, HeaderValue, StatusCode, header};

use crate::ensure;
use crate::protocol::{HeaderField, Headers, HttpVersion, MessageHead, ParseError, PayloadSize, StartLine};

/// Head of an HTTP response.
pub type ResponseHead = MessageHead<StatusLine>;

/// Value of the `Server` header added by [`ResponseHead::add_server_header`].
pub const SERVER_NAME: &str = concat!("strand/", env!("CARGO_PKG_VERSION"));

/// `HTTP/major.minor SP code SP reason`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    version: HttpVersion,
    status: StatusCode,
    reason: String,
}

impl StatusLine {
    pub fn new(status: StatusCode) -> Self {
        Self { version: HttpVersion::HTTP_11, status, reason: canonical_reason(status) }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
        self.reason = canonical_reason(status);
    }
}

fn canonical_reason(status: StatusCode) -> String {
    status.canonical_reason().unwrap_or_default().to_owned()
}

impl StartLine for StatusLine {
    fn parse(line: &[u8]) -> Result<Self, ParseError> {
        let mut parts = line.splitn(3, |b| *b == b' ');

        let version = HttpVersion::parse(parts.next().unwrap_or_default())?;
        ensure!(version.major() == 1, ParseError::InvalidVersion(version.to_string()));

        let code = parts.next().ok_or_else(|| ParseError::invalid_start_line("missing status code"))?;
        let invalid_status = || ParseError::InvalidStatus(String::from_utf8_lossy(code).into_owned());
        ensure!(code.len() == 3 && code.iter().all(u8::is_ascii_digit), invalid_status());
        let status = StatusCode::from_bytes(code).map_err(|_| invalid_status())?;
        ensure!(status.as_u16() < 600, invalid_status());

        // the reason phrase may be empty or missing altogether
        let reason = String::from_utf8_lossy(parts.next().unwrap_or_default()).trim().to_owned();

        Ok(Self { version, status, reason })
    }

    fn encode(&self, dst: &mut BytesMut) {
        dst.reserve(self.reason.len() + 16);
        dst.put_slice(self.version.to_string().as_bytes());
        dst.put_u8(b' ');
        dst.put_slice(self.status.as_str().as_bytes());
        dst.put_u8(b' ');
        dst.put_slice(self.reason.as_bytes());
        dst.put_slice(b"\r\n");
    }

    fn version(&self) -> HttpVersion {
        self.version
    }

    /// 1xx, 204 and 304 never carry a body; without chunked or Content-Length the
    /// body runs until the connection closes.
    fn payload_size(head: &ResponseHead) -> Result<PayloadSize, ParseError> {
        let status = head.status();
        if status.is_informational() || status == StatusCode::NO_CONTENT || status == StatusCode::NOT_MODIFIED {
            return Ok(PayloadSize::Empty);
        }

        let headers = head.headers();
        if headers.has_transfer_encoding() {
            return Ok(if headers.is_chunked() { PayloadSize::Chunked } else { PayloadSize::UntilClose });
        }

        match headers.content_length()? {
            Some(0) => Ok(PayloadSize::Empty),
            Some(length) => Ok(PayloadSize::Length(length)),
            None => Ok(PayloadSize::UntilClose),
        }
    }

    fn announces_empty_body(&self) -> bool {
        let status = self.status;
        !(status.is_informational() || status == StatusCode::NO_CONTENT || status == StatusCode::NOT_MODIFIED)
    }
}

impl fmt::Display for StatusLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.version, self.status.as_str(), self.reason)
    }
}

impl MessageHead<StatusLine> {
    /// Creates a HTTP/1.1 response head without fields.
    pub fn response(status: StatusCode) -> Self {
        Self::new(StatusLine::new(status), Headers::new())
    }

    pub fn status(&self) -> StatusCode {
        self.line().status()
    }

    pub fn reason(&self) -> &str {
        self.line().reason()
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.line_mut().set_status(status);
    }

    /// Appends a header field.
    pub fn add_header(&mut self, name: HeaderName, value: HeaderValue) -> &mut Self {
        self.headers_mut().add(HeaderField::from_typed(&name, &value));
        self
    }

    pub fn add_server_header(&mut self) -> &mut Self {
        self.add_header(header::SERVER, HeaderValue::from_static(SERVER_NAME))
    }

    /// Adds a `Date` header holding the current time in IMF-fixdate format.
    pub fn add_date_header(&mut self) -> &mut Self {
        let mut buf = faf_http_date::get_date_buff_no_key();
        faf_http_date::get_date_no_key(&mut buf);
        if let Ok(value) = HeaderValue::from_bytes(&buf) {
            self.add_header(header::DATE, value);
        }
        self
    }
}
