//! An incremental HTTP/1.1 protocol engine
//!
//! This crate turns a stream of arbitrarily sized byte fragments, as a
//! non-blocking socket delivers them, into HTTP messages and events, and
//! serializes responses back into wire bytes. It performs no I/O itself: the
//! transport feeds it bytes and writes out what it produces.
//!
//! # Features
//!
//! - Resumable parsers for header lines, message heads, chunk size lines and
//!   whole chunks, with no lookahead beyond the bytes that arrived
//! - Chunk extensions and trailer fields kept verbatim
//! - Content-Length, chunked and read-until-close bodies
//! - Keep-alive and pipelining, `Expect: 100-continue`
//! - Configurable limits with canned `400`, `413` and `431` responses
//! - Lenient bare-LF and folded header handling, or strict CRLF
//!
//! # Example
//!
//! ```
//! use bytes::Bytes;
//! use http::StatusCode;
//! use strand_http::connection::{ConnectionDriver, Event};
//! use strand_http::protocol::ResponseHead;
//!
//! let mut driver = ConnectionDriver::default();
//! driver.receive(b"GET /hello HTTP/1.1\r\nHost: localhost\r\n\r\n");
//!
//! while let Some(event) = driver.poll_event() {
//!     if let Event::Request { head, .. } = event {
//!         assert_eq!(head.uri(), "/hello");
//!         driver.send_response(ResponseHead::response(StatusCode::OK), Bytes::from_static(b"Hello World!")).unwrap();
//!     }
//! }
//!
//! let wire = driver.take_output().unwrap();
//! assert!(wire.starts_with(b"HTTP/1.1 200 OK\r\n"));
//! ```
//!
//! # Architecture
//!
//! - [`protocol`]: heads, header fields, chunks, message items and errors
//! - [`codec`]: [`tokio_util::codec`] decoders and encoders for heads and bodies
//! - [`connection`]: the per-connection [`ConnectionDriver`](connection::ConnectionDriver)
//! - [`config`]: parser limits and connection behaviour
//!
//! # Error Handling
//!
//! - [`protocol::ParseError`]: malformed or oversized input
//! - [`protocol::SendError`]: misuse of the encoders or a closed connection
//! - [`protocol::HttpError`]: either of the two
//!
//! # Limitations
//!
//! - HTTP/1.x only
//! - No TLS and no content codings

pub mod codec;
pub mod config;
pub mod connection;
pub mod protocol;

mod utils;
pub(crate) use utils::ensure;
