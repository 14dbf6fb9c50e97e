use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::Encoder;

use crate::codec::body::{ChunkedEncoder, LengthEncoder};
use crate::protocol::{PayloadItem, PayloadSize, SendError};

/// Writes a body the way its head announced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadEncoder {
    strategy: Strategy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Strategy {
    Length(LengthEncoder),
    Chunked(ChunkedEncoder),
    /// raw bytes, the peer sees the end when the connection closes
    Raw { ended: bool },
    Nothing,
}

impl PayloadEncoder {
    pub fn new(payload_size: PayloadSize) -> Self {
        let strategy = match payload_size {
            PayloadSize::Length(0) | PayloadSize::Empty => Strategy::Nothing,
            PayloadSize::Length(length) => Strategy::Length(LengthEncoder::new(length)),
            PayloadSize::Chunked => Strategy::Chunked(ChunkedEncoder::new()),
            PayloadSize::UntilClose => Strategy::Raw { ended: false },
        };
        Self { strategy }
    }

    pub fn is_chunked(&self) -> bool {
        matches!(self.strategy, Strategy::Chunked(_))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.strategy, Strategy::Nothing)
    }

    /// Whether the whole body was written.
    pub fn is_finish(&self) -> bool {
        match &self.strategy {
            Strategy::Length(encoder) => encoder.is_finish(),
            Strategy::Chunked(encoder) => encoder.is_finish(),
            Strategy::Raw { ended } => *ended,
            Strategy::Nothing => true,
        }
    }
}

impl<D: Buf> Encoder<PayloadItem<D>> for PayloadEncoder {
    type Error = SendError;

    fn encode(&mut self, item: PayloadItem<D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match (&mut self.strategy, item) {
            (Strategy::Length(encoder), item) => encoder.encode(item, dst),
            (Strategy::Chunked(encoder), item) => encoder.encode(item, dst),
            (Strategy::Raw { ended: false }, PayloadItem::Chunk(data)) => {
                dst.put(data);
                Ok(())
            }
            (Strategy::Raw { ended }, PayloadItem::LastChunk(_) | PayloadItem::Eof) => {
                *ended = true;
                Ok(())
            }
            (Strategy::Raw { ended: true }, PayloadItem::Chunk(_)) => Err(SendError::unexpected_message("body already ended")),
            (Strategy::Nothing, PayloadItem::Chunk(data)) if data.has_remaining() => {
                Err(SendError::invalid_body("message has no body"))
            }
            (Strategy::Nothing, _) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn chunk(data: &'static [u8]) -> PayloadItem {
        PayloadItem::Chunk(Bytes::from_static(data))
    }

    #[test]
    fn picks_strategy() {
        assert!(PayloadEncoder::new(PayloadSize::Empty).is_empty());
        assert!(PayloadEncoder::new(PayloadSize::Length(0)).is_finish());
        assert!(PayloadEncoder::new(PayloadSize::Chunked).is_chunked());
        assert!(!PayloadEncoder::new(PayloadSize::Length(3)).is_finish());
    }

    #[test]
    fn raw_body_until_close() {
        let mut encoder = PayloadEncoder::new(PayloadSize::UntilClose);
        let mut dst = BytesMut::new();

        encoder.encode(chunk(b"stream "), &mut dst).unwrap();
        encoder.encode(chunk(b"of bytes"), &mut dst).unwrap();
        assert!(!encoder.is_finish());
        encoder.encode(PayloadItem::<Bytes>::Eof, &mut dst).unwrap();

        assert!(encoder.is_finish());
        assert_eq!(&dst[..], b"stream of bytes");
        assert!(encoder.encode(chunk(b"late"), &mut dst).is_err());
    }

    #[test]
    fn no_body_refuses_data() {
        let mut encoder = PayloadEncoder::new(PayloadSize::Empty);
        let mut dst = BytesMut::new();

        encoder.encode(chunk(b""), &mut dst).unwrap();
        assert!(encoder.encode(chunk(b"x"), &mut dst).is_err());
        assert!(dst.is_empty());
    }
}
