//! Body decoding for every framing a head can announce.
//!
//! [`PayloadDecoder::new`] turns the [`PayloadSize`] resolved from a head into
//! a Content-Length, chunked, read-until-close or empty body reader.

use crate::codec::body::ChunkReader;
use crate::codec::body::length_decoder::LengthDecoder;
use crate::config::ParserConfig;
use crate::ensure;
use crate::protocol::{BodyItem, ParseError, PayloadSize};
use bytes::BytesMut;
use tokio_util::codec::Decoder;
use tracing::trace;

/// Reads one message body, ending with exactly one [`BodyItem::Eof`].
#[derive(Debug, Clone)]
pub struct PayloadDecoder {
    kind: Kind,
}

#[derive(Debug, Clone)]
enum Kind {
    Length(LengthDecoder),
    Chunked(ChunkedBody),
    /// everything until the peer closes
    UntilClose { finished: bool },
    NoBody,
}

#[derive(Debug, Clone)]
struct ChunkedBody {
    reader: ChunkReader,
    /// Sum of all chunk sizes so far
    total: u64,
    max_size: u64,
    finished: bool,
}

impl PayloadDecoder {
    pub fn empty() -> Self {
        Self { kind: Kind::NoBody }
    }

    /// Chunks limited one by one and in total by `config.max_body_size`.
    pub fn chunked(config: ParserConfig) -> Self {
        let body = ChunkedBody { reader: ChunkReader::new(config), total: 0, max_size: config.max_body_size, finished: false };
        Self { kind: Kind::Chunked(body) }
    }

    pub fn fix_length(size: u64) -> Self {
        Self { kind: Kind::Length(LengthDecoder::new(size)) }
    }

    /// Body of a response without Content-Length or chunked coding.
    pub fn until_close() -> Self {
        Self { kind: Kind::UntilClose { finished: false } }
    }

    pub fn new(payload_size: PayloadSize, config: ParserConfig) -> Self {
        match payload_size {
            PayloadSize::Length(0) | PayloadSize::Empty => Self::empty(),
            PayloadSize::Length(n) => Self::fix_length(n),
            PayloadSize::Chunked => Self::chunked(config),
            PayloadSize::UntilClose => Self::until_close(),
        }
    }

    pub fn is_chunked(&self) -> bool {
        matches!(self.kind, Kind::Chunked(_))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.kind, Kind::NoBody)
    }

    pub fn is_fix_length(&self) -> bool {
        matches!(self.kind, Kind::Length(_))
    }
}

impl Decoder for PayloadDecoder {
    type Item = BodyItem;
    type Error = ParseError;

    /// Data or chunk items as they complete, then `BodyItem::Eof`.
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match &mut self.kind {
            Kind::Length(decoder) => decoder.decode(src),
            Kind::Chunked(body) => body.decode(src),
            Kind::UntilClose { finished: true } => Ok(Some(BodyItem::Eof)),
            Kind::UntilClose { finished: false } if src.is_empty() => Ok(None),
            Kind::UntilClose { finished: false } => Ok(Some(BodyItem::Data(src.split().freeze()))),
            Kind::NoBody => Ok(Some(BodyItem::Eof)),
        }
    }

    /// Only a close-delimited body may end with the connection.
    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match &mut self.kind {
            Kind::Length(decoder) => decoder.decode_eof(src),
            Kind::Chunked(body) => match body.decode(src)? {
                None => Err(ParseError::UnexpectedEof),
                item => Ok(item),
            },
            Kind::UntilClose { finished } => {
                if !src.is_empty() {
                    return Ok(Some(BodyItem::Data(src.split().freeze())));
                }
                trace!("connection closed, body complete");
                *finished = true;
                Ok(Some(BodyItem::Eof))
            }
            Kind::NoBody => Ok(Some(BodyItem::Eof)),
        }
    }
}

impl ChunkedBody {
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<BodyItem>, ParseError> {
        if self.finished {
            return Ok(Some(BodyItem::Eof));
        }

        let Some(chunk) = self.reader.decode(src)? else {
            return Ok(None);
        };

        self.total = self.total.saturating_add(chunk.size());
        ensure!(self.total <= self.max_size, ParseError::oversized_body(self.total, self.max_size));

        if chunk.is_last() {
            trace!(total = self.total, "finished reading chunked data");
            self.finished = true;
        }
        Ok(Some(BodyItem::Chunk(chunk)))
    }
}
