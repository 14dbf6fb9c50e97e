use crate::protocol::{PayloadItem, SendError};
use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::Encoder;
use tracing::warn;

/// Writes a body whose size was announced with `Content-Length`.
///
/// Writing more than announced is refused, as is ending the body early.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LengthEncoder {
    length: u64,
}

impl LengthEncoder {
    pub fn new(length: u64) -> Self {
        Self { length }
    }

    pub fn is_finish(&self) -> bool {
        self.length == 0
    }
}

impl<D: Buf> Encoder<PayloadItem<D>> for LengthEncoder {
    type Error = SendError;

    fn encode(&mut self, item: PayloadItem<D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match item {
            PayloadItem::Chunk(data) => {
                let size = data.remaining() as u64;
                if size > self.length {
                    warn!(size, remaining = self.length, "payload exceeds content-length");
                    return Err(SendError::invalid_body(format!("{size} bytes written but only {} remain", self.length)));
                }
                dst.put(data);
                self.length -= size;
                Ok(())
            }
            PayloadItem::LastChunk(_) | PayloadItem::Eof if self.length > 0 => {
                Err(SendError::invalid_body(format!("body ended {} bytes short of content-length", self.length)))
            }
            PayloadItem::LastChunk(_) | PayloadItem::Eof => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn exact_length() {
        let mut encoder = LengthEncoder::new(5);
        let mut dst = BytesMut::new();

        encoder.encode(PayloadItem::Chunk(Bytes::from_static(b"hel")), &mut dst).unwrap();
        encoder.encode(PayloadItem::Chunk(Bytes::from_static(b"lo")), &mut dst).unwrap();
        encoder.encode(PayloadItem::<Bytes>::Eof, &mut dst).unwrap();

        assert_eq!(&dst[..], b"hello");
        assert!(encoder.is_finish());
    }

    #[test]
    fn length_mismatch() {
        let mut dst = BytesMut::new();
        assert!(LengthEncoder::new(2).encode(PayloadItem::Chunk(Bytes::from_static(b"abc")), &mut dst).is_err());
        assert!(LengthEncoder::new(2).encode(PayloadItem::<Bytes>::Eof, &mut dst).is_err());
    }
}
