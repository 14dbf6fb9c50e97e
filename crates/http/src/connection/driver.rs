//! Per-connection protocol state machine.
//!
//! [`ConnectionDriver`] performs no I/O. The transport hands it whatever bytes
//! the socket produced with [`receive`](ConnectionDriver::receive), pulls the
//! resulting [`Event`]s with [`poll_event`](ConnectionDriver::poll_event), and
//! writes out whatever [`take_output`](ConnectionDriver::take_output) returns.
//! The application answers through the `send_*` methods.
//!
//! # Request events
//!
//! - Content-Length and empty bodies: one [`Event::Request`] once the body is
//!   complete
//! - Chunked bodies: [`Event::Request`] with an empty body when the head is
//!   complete, then one [`Event::Chunk`] per chunk, the last one flagged
//!   `is_last()`. With [`ConnectionConfig::concatenate_chunks`] the chunks are
//!   collected instead and a single [`Event::Request`] follows the last chunk.
//! - `Expect: 100-continue`: [`Event::ExpectContinue`] before the body is
//!   read; parsing waits until the application answers
//! - Malformed input: [`Event::Invalid`], a canned error response and close

use std::collections::VecDeque;

use bytes::{Bytes, BytesMut};
use http::StatusCode;
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, info, trace, warn};

use crate::codec::{RequestDecoder, ResponseEncoder};
use crate::config::ConnectionConfig;
use crate::protocol::{
    BodyItem, Chunk, HttpVersion, LastChunk, Message, ParseError, PayloadItem, PayloadSize, RequestHead, ResponseHead,
    SendError,
};

/// Something the application has to react to.
#[derive(Debug)]
pub enum Event {
    /// A request; `body` is empty for chunked requests, whose data follows as
    /// [`Event::Chunk`]s unless chunks are concatenated.
    Request { head: RequestHead, body: Bytes },
    /// One chunk of the current chunked request.
    Chunk(Chunk),
    /// The client waits for `100 Continue` before sending the body.
    ExpectContinue { head: RequestHead },
    /// The input broke the protocol; an error response is already queued.
    Invalid(ParseError),
    /// The connection was torn down.
    Disconnected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadState {
    /// Parsing input
    Reading,
    /// Head with `Expect: 100-continue` seen, waiting for the application
    AwaitingContinue,
    /// No further input is parsed, the connection closes once output drains
    Finishing,
    /// Disconnected or closed
    Closed,
}

/// Sans-io driver of one HTTP/1.1 server connection.
#[derive(Debug)]
pub struct ConnectionDriver {
    decoder: RequestDecoder,
    encoder: ResponseEncoder,
    rx_buf: BytesMut,
    tx_buf: BytesMut,
    config: ConnectionConfig,
    state: ReadState,
    events: VecDeque<Event>,

    /// Head of the message being read, then of the last complete request
    request: Option<RequestHead>,
    payload_size: PayloadSize,
    body: BytesMut,

    /// Chunked request whose `Request` event waits for `100 Continue`
    request_deferred: bool,

    /// Requests not yet answered with a final response
    responses_due: usize,
    /// The message being read is already counted in `responses_due`
    head_counted: bool,
    /// Error response waiting for the responses to earlier requests
    pending_error: Option<StatusCode>,
    /// The last request read does not allow another one
    last_request_closes: bool,
    /// The response being written ends the connection
    close_when_done: bool,
    /// A closing response is complete and waits in `tx_buf`
    close_pending: bool,
    should_close: bool,
}

impl ConnectionDriver {
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            decoder: RequestDecoder::new(config.parser),
            encoder: ResponseEncoder::new(),
            rx_buf: BytesMut::new(),
            tx_buf: BytesMut::new(),
            config,
            state: ReadState::Reading,
            events: VecDeque::new(),
            request: None,
            payload_size: PayloadSize::Empty,
            body: BytesMut::new(),
            request_deferred: false,
            responses_due: 0,
            head_counted: false,
            pending_error: None,
            last_request_closes: false,
            close_when_done: false,
            close_pending: false,
            should_close: false,
        }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Feeds bytes read from the transport and parses as far as possible.
    pub fn receive(&mut self, data: &[u8]) {
        match self.state {
            ReadState::Reading => {
                self.rx_buf.extend_from_slice(data);
                self.advance();
            }
            ReadState::AwaitingContinue => self.rx_buf.extend_from_slice(data),
            ReadState::Finishing | ReadState::Closed => {
                trace!(len = data.len(), "discard bytes received after the last request");
            }
        }
    }

    /// Next event in protocol order.
    pub fn poll_event(&mut self) -> Option<Event> {
        self.events.pop_front()
    }

    /// The request being read, or the last one read.
    pub fn request(&self) -> Option<&RequestHead> {
        self.request.as_ref()
    }

    /// Whether the transport should close once it wrote everything taken so far.
    pub fn should_close(&self) -> bool {
        self.should_close
    }

    pub fn is_closed(&self) -> bool {
        self.state == ReadState::Closed
    }

    pub fn has_output(&self) -> bool {
        !self.tx_buf.is_empty()
    }

    /// Bytes to write to the transport, if any.
    pub fn take_output(&mut self) -> Option<Bytes> {
        if self.close_pending {
            self.should_close = true;
        }
        if self.tx_buf.is_empty() {
            return None;
        }
        Some(self.tx_buf.split().freeze())
    }

    /// Drops all in-flight state; nothing is dispatched for a partial message.
    pub fn disconnect(&mut self) -> Event {
        debug!(buffered = self.rx_buf.len(), "connection disconnected");
        self.state = ReadState::Closed;
        self.rx_buf.clear();
        self.tx_buf.clear();
        self.body.clear();
        self.events.clear();
        self.request_deferred = false;
        self.head_counted = false;
        self.pending_error = None;
        self.decoder.reset();
        self.encoder = ResponseEncoder::new();
        self.should_close = true;
        Event::Disconnected
    }

    /// Sends a complete response with `body`, framed by Content-Length.
    ///
    /// A `1xx` status is sent as an interim response; `100 Continue` resumes a
    /// request waiting for it. Any final status while a request still waits for
    /// `100 Continue` rejects its body and closes the connection afterwards.
    pub fn send_response(&mut self, mut head: ResponseHead, body: Bytes) -> Result<(), SendError> {
        if self.state == ReadState::Closed {
            return Err(SendError::Closed);
        }

        if self.encoder.in_body() {
            return Err(SendError::unexpected_message("a chunked response is still in progress"));
        }
        if head.status().is_informational() {
            return self.send_interim(head);
        }

        self.prepare_final(&mut head);
        let payload_size = if body.is_empty() { PayloadSize::Empty } else { PayloadSize::Length(body.len() as u64) };
        self.encoder.encode(Message::<_, PayloadItem>::Header((head, payload_size)), &mut self.tx_buf)?;
        if !body.is_empty() {
            self.encoder.encode(Message::<(ResponseHead, PayloadSize), _>::Payload(PayloadItem::Chunk(body)), &mut self.tx_buf)?;
        }
        self.encoder.encode(Message::<(ResponseHead, PayloadSize), _>::Payload(PayloadItem::<Bytes>::Eof), &mut self.tx_buf)?;
        self.finish_response();
        Ok(())
    }

    /// Starts a chunked response; continue with [`send_chunk`](Self::send_chunk)
    /// and end with [`send_last_chunk`](Self::send_last_chunk).
    pub fn send_chunked_response(&mut self, mut head: ResponseHead) -> Result<(), SendError> {
        if self.state == ReadState::Closed {
            return Err(SendError::Closed);
        }
        if head.status().is_informational() {
            return Err(SendError::unexpected_message("interim response can't carry a body"));
        }
        if self.encoder.in_body() {
            return Err(SendError::unexpected_message("a chunked response is still in progress"));
        }

        self.prepare_final(&mut head);
        self.encoder.encode(Message::<_, PayloadItem>::Header((head, PayloadSize::Chunked)), &mut self.tx_buf)
    }

    pub fn send_chunk(&mut self, data: Bytes) -> Result<(), SendError> {
        self.ensure_chunked_response()?;
        self.encoder.encode(Message::<(ResponseHead, PayloadSize), _>::Payload(PayloadItem::Chunk(data)), &mut self.tx_buf)
    }

    pub fn send_last_chunk(&mut self, last_chunk: LastChunk) -> Result<(), SendError> {
        self.ensure_chunked_response()?;
        self.encoder
            .encode(Message::<(ResponseHead, PayloadSize), _>::Payload(PayloadItem::<Bytes>::LastChunk(last_chunk)), &mut self.tx_buf)?;
        self.finish_response();
        Ok(())
    }

    /// Answers `Expect: 100-continue` for `head`: `413` when the announced body
    /// exceeds the configured limit, `100 Continue` otherwise.
    pub fn continue_or_reject(&mut self, head: &RequestHead) -> Result<(), SendError> {
        let max_size = self.config.parser.max_body_size;
        let too_large = matches!(head.content_length(), Ok(Some(length)) if length > max_size);
        let status = if too_large { StatusCode::PAYLOAD_TOO_LARGE } else { StatusCode::CONTINUE };
        self.send_response(ResponseHead::response(status), Bytes::new())
    }

    fn ensure_chunked_response(&self) -> Result<(), SendError> {
        if self.state == ReadState::Closed {
            return Err(SendError::Closed);
        }
        if !self.encoder.in_body() {
            return Err(SendError::unexpected_message("no chunked response in progress"));
        }
        Ok(())
    }

    fn send_interim(&mut self, head: ResponseHead) -> Result<(), SendError> {
        let resumes = head.status() == StatusCode::CONTINUE && self.state == ReadState::AwaitingContinue;
        self.encoder.encode(Message::<_, PayloadItem>::Header((head, PayloadSize::Empty)), &mut self.tx_buf)?;
        self.encoder.encode(Message::<(ResponseHead, PayloadSize), _>::Payload(PayloadItem::<Bytes>::Eof), &mut self.tx_buf)?;

        if resumes {
            info!("sent continue response, reading body");
            self.state = ReadState::Reading;
            if std::mem::take(&mut self.request_deferred) {
                if let Some(head) = &self.request {
                    self.events.push_back(Event::Request { head: head.clone(), body: Bytes::new() });
                }
            }
            self.advance();
        }
        Ok(())
    }

    /// Decides whether the final response closes the connection and marks it so.
    fn prepare_final(&mut self, head: &mut ResponseHead) {
        self.responses_due = self.responses_due.saturating_sub(1);

        let rejects_body = self.state == ReadState::AwaitingContinue;
        let last_due = self.responses_due == 0 && self.pending_error.is_none();
        let closes = rejects_body
            || (last_due && (self.state == ReadState::Finishing || self.last_request_closes))
            || head.headers().close_requested();

        if rejects_body {
            info!(status = %head.status(), "rejected body of expect-continue request");
            self.request_deferred = false;
        }
        if closes {
            head.headers_mut().set_close();
            self.stop_reading();
        }
        self.close_when_done = closes;
    }

    fn finish_response(&mut self) {
        if self.close_when_done {
            self.close_when_done = false;
            self.close_pending = true;
            if let Some(status) = self.pending_error.take() {
                debug!(%status, "connection closes, error response dropped");
            }
        } else if self.responses_due == 0 {
            if let Some(status) = self.pending_error.take() {
                self.queue_error_response(status);
            }
        }
    }

    fn stop_reading(&mut self) {
        if self.state != ReadState::Closed {
            self.state = ReadState::Finishing;
        }
        self.rx_buf.clear();
    }

    /// Runs the decoder over buffered input while reading is allowed.
    fn advance(&mut self) {
        while self.state == ReadState::Reading {
            match self.decoder.decode(&mut self.rx_buf) {
                Ok(Some(Message::Header((head, payload_size)))) => self.on_head(head, payload_size),
                Ok(Some(Message::Payload(item))) => self.on_body_item(item),
                Ok(None) => break,
                Err(error) => self.on_invalid(error),
            }
        }
    }

    fn on_head(&mut self, head: RequestHead, payload_size: PayloadSize) {
        debug!(method = %head.method(), uri = head.uri(), ?payload_size, "received request head");
        self.responses_due += 1;
        self.head_counted = true;
        self.last_request_closes = !head.keep_alive();
        self.payload_size = payload_size;
        self.body.clear();

        let expects_continue = head.expects_continue() && !payload_size.is_empty() && head.version() >= HttpVersion::HTTP_11;
        if expects_continue {
            self.events.push_back(Event::ExpectContinue { head: head.clone() });
            self.state = ReadState::AwaitingContinue;
        }

        if payload_size.is_chunked() && !self.config.concatenate_chunks {
            if expects_continue {
                self.request_deferred = true;
            } else {
                self.events.push_back(Event::Request { head: head.clone(), body: Bytes::new() });
            }
        }
        self.request = Some(head);
    }

    fn on_body_item(&mut self, item: BodyItem) {
        match item {
            BodyItem::Data(data) => self.body.extend_from_slice(&data),
            BodyItem::Chunk(chunk) if self.config.concatenate_chunks => {
                self.body.extend_from_slice(chunk.data());
                if let Some(head) = &mut self.request {
                    for field in chunk.trailers() {
                        head.headers_mut().add(field.clone());
                    }
                }
            }
            BodyItem::Chunk(chunk) => {
                trace!(size = chunk.size(), last = chunk.is_last(), "received chunk");
                self.events.push_back(Event::Chunk(chunk));
            }
            BodyItem::Eof => self.on_message_complete(),
        }
    }

    fn on_message_complete(&mut self) {
        self.head_counted = false;
        if !self.payload_size.is_chunked() || self.config.concatenate_chunks {
            if let Some(head) = &self.request {
                let body = self.body.split().freeze();
                self.events.push_back(Event::Request { head: head.clone(), body });
            }
        }

        if self.last_request_closes {
            debug!("request does not keep the connection alive, stop reading");
            self.stop_reading();
        }
    }

    /// Answers malformed input with a canned error response, after the
    /// responses still due to earlier requests.
    fn on_invalid(&mut self, error: ParseError) {
        let status = error.status_code();
        warn!(%error, %status, "invalid request, closing connection");
        self.stop_reading();

        // the canned response answers the broken message itself
        if std::mem::take(&mut self.head_counted) {
            self.responses_due = self.responses_due.saturating_sub(1);
        }
        if self.responses_due > 0 || self.encoder.in_body() {
            debug!(due = self.responses_due, "error response queued behind earlier responses");
            self.pending_error = Some(status);
        } else {
            self.queue_error_response(status);
        }
        self.events.push_back(Event::Invalid(error));
    }

    fn queue_error_response(&mut self, status: StatusCode) {
        let mut head = ResponseHead::response(status);
        head.headers_mut().set_close();
        let encoded = self
            .encoder
            .encode(Message::<_, PayloadItem>::Header((head, PayloadSize::Empty)), &mut self.tx_buf)
            .and_then(|()| self.encoder.encode(Message::<(ResponseHead, PayloadSize), _>::Payload(PayloadItem::<Bytes>::Eof), &mut self.tx_buf));
        if let Err(e) = encoded {
            warn!(cause = %e, "can't queue error response");
        }
        self.close_pending = true;
    }
}

impl Default for ConnectionDriver {
    fn default() -> Self {
        Self::new(ConnectionConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;

    fn output(driver: &mut ConnectionDriver) -> String {
        driver.take_output().map(|bytes| String::from_utf8(bytes.to_vec()).unwrap()).unwrap_or_default()
    }

    #[test]
    fn simple_get() {
        let mut driver = ConnectionDriver::default();
        driver.receive(b"GET /hello HTTP/1.1\r\nHost: localhost\r\n\r\n");

        let Some(Event::Request { head, body }) = driver.poll_event() else { panic!("expected a request") };
        assert_eq!(head.method(), &Method::GET);
        assert_eq!(head.uri(), "/hello");
        assert!(body.is_empty());
        assert!(driver.poll_event().is_none());

        driver.send_response(ResponseHead::response(StatusCode::OK), Bytes::from_static(b"hi")).unwrap();
        assert_eq!(output(&mut driver), "HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nhi");
        assert!(!driver.should_close());
    }

    #[test]
    fn fragmented_body() {
        let mut driver = ConnectionDriver::default();
        for b in b"PUT /hello HTTP/1.1\r\nContent-Length: 5\r\n\r\nhello" {
            driver.receive(&[*b]);
        }

        let Some(Event::Request { body, .. }) = driver.poll_event() else { panic!("expected a request") };
        assert_eq!(&body[..], b"hello");
    }

    #[test]
    fn concatenated_chunks() {
        let config = ConnectionConfig { concatenate_chunks: true, ..ConnectionConfig::default() };
        let mut driver = ConnectionDriver::new(config);
        driver.receive(b"POST / HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n3\r\nabc\r\n2\r\nde\r\n0\r\nX-Sum: 5\r\n\r\n");

        let Some(Event::Request { head, body }) = driver.poll_event() else { panic!("expected a request") };
        assert_eq!(&body[..], b"abcde");
        assert_eq!(head.headers().find("x-sum"), Some("5"));
        assert!(driver.poll_event().is_none());
    }

    #[test]
    fn http10_closes() {
        let mut driver = ConnectionDriver::default();
        driver.receive(b"GET / HTTP/1.0\r\n\r\nGET /ignored HTTP/1.0\r\n\r\n");

        assert!(matches!(driver.poll_event(), Some(Event::Request { .. })));
        assert!(driver.poll_event().is_none());

        driver.send_response(ResponseHead::response(StatusCode::OK), Bytes::new()).unwrap();
        assert!(!driver.should_close());
        assert_eq!(output(&mut driver), "HTTP/1.1 200 OK\r\nConnection: close\r\nContent-Length: 0\r\n\r\n");
        assert!(driver.should_close());
    }

    #[test]
    fn invalid_request_gets_canned_response() {
        let mut driver = ConnectionDriver::default();
        driver.receive(b"GET / HTTP/1.1\r\nBad Header: x\r\n\r\n");

        assert!(matches!(driver.poll_event(), Some(Event::Invalid(ParseError::InvalidHeader { .. }))));
        assert_eq!(output(&mut driver), "HTTP/1.1 400 Bad Request\r\nConnection: close\r\nContent-Length: 0\r\n\r\n");
        assert!(driver.should_close());
    }

    #[test]
    fn send_after_disconnect() {
        let mut driver = ConnectionDriver::default();
        driver.receive(b"GET / HTTP/1.1\r\n");

        assert!(matches!(driver.disconnect(), Event::Disconnected));
        assert!(driver.is_closed());
        assert!(matches!(driver.send_response(ResponseHead::response(StatusCode::OK), Bytes::new()), Err(SendError::Closed)));
        assert!(driver.poll_event().is_none());
    }

    #[test]
    fn chunk_without_chunked_response() {
        let mut driver = ConnectionDriver::default();
        assert!(driver.send_chunk(Bytes::from_static(b"x")).is_err());
    }
}
