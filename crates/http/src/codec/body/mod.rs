//! HTTP body handling module for processing request and response payloads
//!
//! # Components
//!
//! ## Decoders
//! - [`ChunkHeaderParser`]: one `hex-size[;ext]` line of a chunked body
//! - [`ChunkReader`]: a whole chunk, data, closing CRLF and trailers included
//! - [`LengthDecoder`]: fixed-length payloads
//! - [`PayloadDecoder`]: picks the strategy for a [`PayloadSize`](crate::protocol::PayloadSize)
//!
//! ## Encoders
//! - [`ChunkedEncoder`]: chunked transfer encoding
//! - [`LengthEncoder`]: fixed-length payloads
//! - [`PayloadEncoder`]: picks the strategy for a [`PayloadSize`](crate::protocol::PayloadSize)

mod chunk_header_parser;
mod chunk_reader;
mod chunked_encoder;
mod length_decoder;
mod length_encoder;
mod payload_decoder;
mod payload_encoder;

pub use chunk_header_parser::ChunkHeaderParser;
pub use chunk_reader::ChunkReader;
pub use chunked_encoder::ChunkedEncoder;
pub use length_decoder::LengthDecoder;
pub use length_encoder::LengthEncoder;
pub use payload_decoder::PayloadDecoder;
pub use payload_encoder::PayloadEncoder;
