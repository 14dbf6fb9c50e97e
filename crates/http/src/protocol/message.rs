use bytes::{Buf, Bytes};

use crate::protocol::{Chunk, LastChunk};

/// A head or a piece of the body that follows it.
///
/// Decoders produce `Message<(Head, PayloadSize), BodyItem>` and encoders take
/// `Message<(Head, PayloadSize), PayloadItem<D>>`.
#[derive(Debug)]
pub enum Message<T, P = BodyItem> {
    Header(T),
    Payload(P),
}

/// Outgoing body item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadItem<Data: Buf = Bytes> {
    /// Body bytes; one chunk on the wire when the body is chunked
    Chunk(Data),
    /// Terminal chunk with extension and trailers, a plain end for other bodies
    LastChunk(LastChunk),
    Eof,
}

/// Incoming body item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyItem {
    /// Bytes of a Content-Length or read-until-close body, as they arrive
    Data(Bytes),
    /// A complete chunk, the last one included
    Chunk(Chunk),
    Eof,
}

/// How a body is delimited on the wire.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PayloadSize {
    Length(u64),
    Chunked,
    /// Until the connection closes, responses only
    UntilClose,
    Empty,
}

impl PayloadSize {
    #[inline]
    pub fn is_chunked(&self) -> bool {
        matches!(self, PayloadSize::Chunked)
    }

    /// `Empty` or a zero Content-Length.
    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, PayloadSize::Empty | PayloadSize::Length(0))
    }
}

impl<D: Buf> PayloadItem<D> {
    /// Whether this item ends the body.
    #[inline]
    pub fn is_eof(&self) -> bool {
        matches!(self, PayloadItem::Eof | PayloadItem::LastChunk(_))
    }
}

impl BodyItem {
    #[inline]
    pub fn is_eof(&self) -> bool {
        matches!(self, BodyItem::Eof)
    }

    /// Body bytes carried by this item, chunk data included.
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            BodyItem::Data(bytes) => Some(bytes),
            BodyItem::Chunk(chunk) => Some(chunk.data()),
            BodyItem::Eof => None,
        }
    }

    pub fn into_chunk(self) -> Option<Chunk> {
        match self {
            BodyItem::Chunk(chunk) => Some(chunk),
            _ => None,
        }
    }
}
