//! HTTP codec module for encoding and decoding HTTP messages
//!
//! Every parser here implements [`tokio_util::codec::Decoder`] and every
//! writer [`tokio_util::codec::Encoder`], so they work on a bare `BytesMut` as
//! well as inside a `Framed` transport. Parsers consume every byte they look
//! at and keep partial state internally: input can be cut anywhere and fed in
//! as many pieces as it arrives in.
//!
//! # Architecture
//!
//! - Decoding:
//!   - [`MessageDecoder`] ([`RequestDecoder`], [`ResponseDecoder`]): heads then body items
//!   - [`header`]: [`FieldParser`](header::FieldParser) and [`HeadParser`](header::HeadParser)
//!   - [`body`]: [`ChunkHeaderParser`](body::ChunkHeaderParser),
//!     [`ChunkReader`](body::ChunkReader) and [`PayloadDecoder`](body::PayloadDecoder)
//!
//! - Encoding:
//!   - [`MessageEncoder`] ([`ResponseEncoder`], [`RequestEncoder`])
//!   - head encoding via [`header`], body encoding via [`body`]
//!
//! Decoders return `Ok(None)` for incomplete input; it is never an error.

pub mod body;
pub mod header;
mod message_decoder;
mod message_encoder;

pub use message_decoder::MessageDecoder;
pub use message_decoder::RequestDecoder;
pub use message_decoder::ResponseDecoder;
pub use message_encoder::MessageEncoder;
pub use message_encoder::RequestEncoder;
pub use message_encoder::ResponseEncoder;
