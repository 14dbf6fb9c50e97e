//! Chunks of a `Transfer-Encoding: chunked` body.
//!
//! A [`ChunkHeader`] is the `hex-size [; extension] CRLF` line in front of every
//! chunk. A received [`Chunk`] owns its header, exactly `size` bytes of data and,
//! for the terminal zero-size chunk, the trailer fields that followed it.
//! [`LastChunk`] describes the terminal chunk of an outgoing body.

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

use crate::protocol::Headers;

/// The size line of a chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkHeader {
    hex_size: String,
    size: u64,
    extension: String,
}

impl ChunkHeader {
    /// Creates the header of an outgoing chunk of `size` bytes.
    pub fn new(size: u64) -> Self {
        Self { hex_size: format!("{size:x}"), size, extension: String::new() }
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    pub(crate) fn from_parts(hex_size: String, size: u64, extension: String) -> Self {
        Self { hex_size, size, extension }
    }

    /// The size exactly as it appeared on the wire.
    pub fn hex_size(&self) -> &str {
        &self.hex_size
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Raw extension text following the `;`, not decoded.
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// A zero-size chunk ends the body.
    #[inline]
    pub fn is_last(&self) -> bool {
        self.size == 0
    }

    /// Writes the size line including its CRLF.
    pub fn encode(&self, dst: &mut BytesMut) {
        dst.reserve(self.hex_size.len() + self.extension.len() + 4);
        dst.put_slice(self.hex_size.as_bytes());
        if !self.extension.is_empty() {
            dst.put_slice(b"; ");
            dst.put_slice(self.extension.as_bytes());
        }
        dst.put_slice(b"\r\n");
    }
}

impl fmt::Display for ChunkHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hex_size)?;
        if !self.extension.is_empty() {
            write!(f, "; {}", self.extension)?;
        }
        f.write_str("\r\n")
    }
}

/// A fully received chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    header: ChunkHeader,
    data: Bytes,
    trailers: Headers,
}

impl Chunk {
    pub(crate) fn new(header: ChunkHeader, data: Bytes, trailers: Headers) -> Self {
        Self { header, data, trailers }
    }

    pub fn header(&self) -> &ChunkHeader {
        &self.header
    }

    pub fn size(&self) -> u64 {
        self.header.size()
    }

    pub fn hex_size(&self) -> &str {
        self.header.hex_size()
    }

    pub fn extension(&self) -> &str {
        self.header.extension()
    }

    pub fn is_last(&self) -> bool {
        self.header.is_last()
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Trailer fields, only ever present on the last chunk.
    pub fn trailers(&self) -> &Headers {
        &self.trailers
    }

    pub fn into_parts(self) -> (ChunkHeader, Bytes, Headers) {
        (self.header, self.data, self.trailers)
    }

    /// Whether the chunk obeyed the grammar: the data matches the declared size and
    /// only the zero-size chunk carries trailers.
    pub fn valid(&self) -> bool {
        self.data.len() as u64 == self.header.size() && (self.is_last() || self.trailers.is_empty())
    }
}

impl fmt::Display for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.header)?;
        if self.is_last() {
            write!(f, "{}", self.trailers)?;
        }
        Ok(())
    }
}

/// The terminal chunk of an outgoing chunked body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LastChunk {
    extension: String,
    trailers: Headers,
}

impl LastChunk {
    pub fn new(extension: impl Into<String>, trailers: Headers) -> Self {
        Self { extension: extension.into(), trailers }
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn trailers(&self) -> &Headers {
        &self.trailers
    }

    /// Writes `0[; ext]CRLF`, the trailers and the closing blank line.
    pub fn encode(&self, dst: &mut BytesMut) {
        ChunkHeader::new(0).with_extension(self.extension.as_str()).encode(dst);
        self.trailers.encode(dst);
        dst.put_slice(b"\r\n");
    }

    /// The wire form as a string.
    pub fn message(&self) -> String {
        let mut message = ChunkHeader::new(0).with_extension(self.extension.as_str()).to_string();
        message.push_str(&format!("{}\r\n", self.trailers));
        message
    }
}
