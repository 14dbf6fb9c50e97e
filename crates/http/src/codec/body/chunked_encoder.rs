use crate::protocol::{ChunkHeader, PayloadItem, SendError};
use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::Encoder;
use tracing::trace;

/// Writes a body with chunked transfer encoding.
///
/// Every non-empty [`PayloadItem::Chunk`] becomes one chunk; `Eof` writes the
/// bare terminal chunk, `LastChunk` the terminal chunk with its extension and
/// trailers. Empty data is skipped since a zero-size chunk would end the body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkedEncoder {
    eof: bool,
    send_size: u64,
}

impl ChunkedEncoder {
    pub fn new() -> Self {
        Self { eof: false, send_size: 0 }
    }

    pub fn is_finish(&self) -> bool {
        self.eof
    }
}

impl Default for ChunkedEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Buf> Encoder<PayloadItem<D>> for ChunkedEncoder {
    type Error = SendError;

    fn encode(&mut self, item: PayloadItem<D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if self.eof {
            return Err(SendError::unexpected_message("chunked body already finished"));
        }

        match item {
            PayloadItem::Chunk(data) => {
                let size = data.remaining();
                if size == 0 {
                    return Ok(());
                }
                ChunkHeader::new(size as u64).encode(dst);
                dst.reserve(size + 2);
                dst.put(data);
                dst.put_slice(b"\r\n");
                self.send_size += size as u64;
            }
            PayloadItem::LastChunk(last_chunk) => {
                self.eof = true;
                last_chunk.encode(dst);
                trace!(size = self.send_size, "finished chunked body");
            }
            PayloadItem::Eof => {
                self.eof = true;
                dst.extend_from_slice(b"0\r\n\r\n");
                trace!(size = self.send_size, "finished chunked body");
            }
        }
        Ok(())
    }
}
