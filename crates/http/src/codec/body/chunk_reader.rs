//! Reader for one complete chunk of a chunked body.
//!
//! A chunk is read in phases:
//!
//! 1. the size line, through [`ChunkHeaderParser`]
//! 2. exactly `size` data bytes, collected across calls
//! 3. the CRLF closing the data (a bare LF when lenient)
//! 4. for the last chunk only, trailer fields up to the blank line
//!
//! The reader then yields the assembled [`Chunk`] and is ready for the next one.

use bytes::{Buf, BytesMut};
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::codec::body::ChunkHeaderParser;
use crate::codec::header::{FieldItem, FieldParser};
use crate::config::ParserConfig;
use crate::ensure;
use crate::protocol::{Chunk, ChunkHeader, Headers, ParseError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChunkState {
    /// Read the size line
    Header,
    /// Read chunk data
    Data,
    /// Read CR after chunk data
    DataCr,
    /// Read LF after chunk data
    DataLf,
    /// Read trailer fields after the last chunk
    Trailers,
}

/// Decoder yielding one [`Chunk`] per call that completes a chunk.
#[derive(Debug, Clone)]
pub struct ChunkReader {
    state: ChunkState,
    header_parser: ChunkHeaderParser,
    header: Option<ChunkHeader>,
    remaining: u64,
    data: BytesMut,
    fields: FieldParser,
    trailers: Headers,
    trailer_bytes: usize,
    config: ParserConfig,
}

impl ChunkReader {
    pub fn new(config: ParserConfig) -> Self {
        Self {
            state: ChunkState::Header,
            header_parser: ChunkHeaderParser::new(config),
            header: None,
            remaining: 0,
            data: BytesMut::new(),
            fields: FieldParser::new(config),
            trailers: Headers::new(),
            trailer_bytes: 0,
            config,
        }
    }

    fn start_chunk(&mut self, header: ChunkHeader) -> Result<(), ParseError> {
        let max_size = self.config.max_body_size;
        ensure!(header.size() <= max_size, ParseError::oversized_body(header.size(), max_size));

        self.remaining = header.size();
        self.state = if header.is_last() { ChunkState::Trailers } else { ChunkState::Data };
        self.header = Some(header);
        Ok(())
    }

    fn read_data(&mut self, src: &mut BytesMut) {
        let len = usize::try_from(self.remaining).unwrap_or(usize::MAX).min(src.len());
        let part = src.split_to(len);
        if self.data.is_empty() {
            self.data = part;
        } else {
            self.data.extend_from_slice(&part);
        }
        self.remaining -= len as u64;
        if self.remaining == 0 {
            self.state = ChunkState::DataCr;
        }
    }

    /// Returns `true` once the blank line ending the trailers was read.
    fn read_trailers(&mut self, src: &mut BytesMut) -> Result<bool, ParseError> {
        loop {
            let before = src.len();
            let item = self.fields.decode(src)?;
            self.trailer_bytes += before - src.len();
            let max_size = self.config.max_header_bytes;
            ensure!(self.trailer_bytes <= max_size, ParseError::too_large_header(self.trailer_bytes, max_size));

            match item {
                Some(FieldItem::Field(field)) => {
                    ensure!(self.trailers.len() < self.config.max_headers, ParseError::too_many_headers(self.config.max_headers));
                    self.trailers.add(field);
                }
                Some(FieldItem::Continuation(continuation)) => {
                    let field = self.trailers.last_mut().ok_or_else(|| ParseError::invalid_header("continuation line before any trailer"))?;
                    field.append_continuation(&continuation);
                }
                Some(FieldItem::End) => return Ok(true),
                None => return Ok(false),
            }
        }
    }

    fn take_chunk(&mut self) -> Result<Chunk, ParseError> {
        let header = self.header.take().ok_or_else(|| ParseError::invalid_chunk("chunk without size line"))?;
        let data = std::mem::take(&mut self.data).freeze();
        let trailers = std::mem::take(&mut self.trailers);
        self.state = ChunkState::Header;
        self.trailer_bytes = 0;

        let chunk = Chunk::new(header, data, trailers);
        ensure!(chunk.valid(), ParseError::invalid_chunk("chunk data does not match its size"));
        Ok(chunk)
    }
}

impl Decoder for ChunkReader {
    type Item = Chunk;
    type Error = ParseError;

    /// Decodes the next complete chunk.
    ///
    /// # Returns
    /// - `Ok(Some(chunk))` once a whole chunk (and its trailers, if last) was read
    /// - `Ok(None)` when more data is needed; partial data is kept internally
    /// - `Err(ParseError)` on malformed framing or an oversized chunk
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let lenient = !self.config.strict_crlf;
        loop {
            match self.state {
                ChunkState::Header => match self.header_parser.decode(src)? {
                    Some(header) => self.start_chunk(header)?,
                    None => return Ok(None),
                },

                ChunkState::Data => {
                    if src.is_empty() {
                        return Ok(None);
                    }
                    self.read_data(src);
                }

                ChunkState::DataCr | ChunkState::DataLf => {
                    if src.is_empty() {
                        return Ok(None);
                    }
                    match (self.state, src.get_u8()) {
                        (ChunkState::DataCr, b'\r') => self.state = ChunkState::DataLf,
                        (ChunkState::DataCr, b'\n') if lenient => return self.take_chunk().map(Some),
                        (ChunkState::DataLf, b'\n') => return self.take_chunk().map(Some),
                        _ => return Err(ParseError::invalid_chunk("missing CRLF after chunk data")),
                    }
                }

                ChunkState::Trailers => {
                    if !self.read_trailers(src)? {
                        return Ok(None);
                    }
                    let chunk = self.take_chunk()?;
                    trace!(trailers = chunk.trailers().len(), "read last chunk");
                    return Ok(Some(chunk));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reader() -> ChunkReader {
        ChunkReader::new(ParserConfig::default())
    }

    #[test]
    fn test_basic() {
        let mut buffer: BytesMut = BytesMut::from(&b"10\r\n1234567890abcdef\r\n0\r\n\r\n"[..]);
        let mut reader = reader();

        let chunk = reader.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(chunk.size(), 16);
        assert_eq!(&chunk.data()[..], b"1234567890abcdef");
        assert!(!chunk.is_last());

        let chunk = reader.decode(&mut buffer).unwrap().unwrap();
        assert!(chunk.is_last());
        assert!(chunk.data().is_empty());
        assert!(chunk.trailers().is_empty());

        assert!(buffer.is_empty());
    }

    #[test]
    fn last_chunk_with_trailers() {
        let mut buffer = BytesMut::from(&b"0; done\r\nExpires: never\r\nX-Checksum: 12\r\n\r\nGET"[..]);
        let chunk = reader().decode(&mut buffer).unwrap().unwrap();

        assert!(chunk.is_last());
        assert_eq!(chunk.extension(), "done");
        assert_eq!(chunk.trailers().len(), 2);
        assert_eq!(chunk.trailers().find("expires"), Some("never"));
        assert_eq!(&buffer[..], b"GET");
    }

    #[test]
    fn data_split_across_calls() {
        let mut reader = reader();

        let mut buffer = BytesMut::from(&b"a\r\nhello"[..]);
        assert!(reader.decode(&mut buffer).unwrap().is_none());
        assert!(buffer.is_empty());

        let mut buffer = BytesMut::from(&b"world\r"[..]);
        assert!(reader.decode(&mut buffer).unwrap().is_none());

        let mut buffer = BytesMut::from(&b"\n"[..]);
        let chunk = reader.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(&chunk.data()[..], b"helloworld");
        assert!(chunk.valid());
    }

    #[test]
    fn missing_crlf_after_data() {
        let mut buffer = BytesMut::from(&b"3\r\nabcd\r\n"[..]);
        assert!(reader().decode(&mut buffer).is_err());

        let mut buffer = BytesMut::from(&b"3\r\nabc\n"[..]);
        assert!(reader().decode(&mut buffer).unwrap().is_some());

        let strict = ParserConfig { strict_crlf: true, ..ParserConfig::default() };
        let mut buffer = BytesMut::from(&b"3\r\nabc\n"[..]);
        assert!(ChunkReader::new(strict).decode(&mut buffer).is_err());
    }

    #[test]
    fn oversized_chunk() {
        let config = ParserConfig { max_body_size: 8, ..ParserConfig::default() };
        let mut buffer = BytesMut::from(&b"9\r\n"[..]);
        let error = ChunkReader::new(config).decode(&mut buffer).unwrap_err();
        assert!(error.is_oversized());
    }

    #[test]
    fn too_many_trailers() {
        let config = ParserConfig { max_headers: 1, ..ParserConfig::default() };
        let mut buffer = BytesMut::from(&b"0\r\nA: 1\r\nB: 2\r\n\r\n"[..]);
        let result = ChunkReader::new(config).decode(&mut buffer);
        assert!(matches!(result, Err(ParseError::TooManyHeaders { .. })));
    }
}
