//! Core HTTP protocol types.
//!
//! This module holds the data the rest of the engine passes around: message
//! heads, header fields, chunks, the items decoders emit and encoders accept,
//! and the error types.
//!
//! # Architecture
//!
//! - **Heads** ([`head`], [`request`], [`response`]): a [`StartLine`] plus [`Headers`]
//!   - [`RequestHead`]: request line (method, URI, version) and fields
//!   - [`ResponseHead`]: status line (version, code, reason) and fields
//!
//! - **Header fields** ([`header`]): [`HeaderField`] and the ordered [`Headers`]
//!   collection deriving content length, chunked, close and expect-continue facts
//!
//! - **Chunks** ([`chunk`]): [`ChunkHeader`], received [`Chunk`]s and the outgoing
//!   [`LastChunk`]
//!
//! - **Message Handling** ([`message`]):
//!   - [`Message`]: either a head or a payload item
//!   - [`BodyItem`]: incoming body data, chunks and EOF
//!   - [`PayloadItem`]: outgoing body data, last chunk and EOF
//!   - [`PayloadSize`]: how a body is delimited
//!
//! - **Error Handling** ([`error`]):
//!   - [`HttpError`]: Top-level error type
//!   - [`ParseError`]: Request parsing errors
//!   - [`SendError`]: Response sending errors

mod message;
pub use message::BodyItem;
pub use message::Message;
pub use message::PayloadItem;
pub use message::PayloadSize;

pub(crate) mod header;
pub use header::HeaderField;
pub use header::Headers;

mod version;
pub use version::HttpVersion;

mod head;
pub use head::MessageHead;
pub use head::StartLine;

mod request;
pub use request::RequestHead;
pub use request::RequestLine;

mod response;
pub use response::ResponseHead;
pub use response::SERVER_NAME;
pub use response::StatusLine;

mod chunk;
pub use chunk::Chunk;
pub use chunk::ChunkHeader;
pub use chunk::LastChunk;

mod error;
pub use error::HttpError;
pub use error::ParseError;
pub use error::SendError;
