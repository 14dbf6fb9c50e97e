//! Encoder serializing a message head
//!
//! Writes the start line and the header fields in insertion order, after
//! making the framing fields agree with the [`PayloadSize`] the body will be
//! written with:
//!
//! - `Length(n)`: `Content-Length: n`, any `Transfer-Encoding` dropped
//! - `Chunked`: `Transfer-Encoding: chunked`, any `Content-Length` dropped
//! - `Empty`: `Content-Length: 0` where the start line calls for it
//! - `UntilClose`: neither field

use bytes::BytesMut;
use tokio_util::codec::Encoder;

use crate::protocol::{MessageHead, PayloadSize, SendError, StartLine};

/// Initial buffer size reserved for a head
const INIT_HEADER_SIZE: usize = 4 * 1024;

const CONTENT_LENGTH: &str = "Content-Length";
const TRANSFER_ENCODING: &str = "Transfer-Encoding";

/// Encoder for message heads implementing the [`Encoder`] trait.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeadEncoder;

impl<L: StartLine> Encoder<(MessageHead<L>, PayloadSize)> for HeadEncoder {
    type Error = SendError;

    fn encode(&mut self, item: (MessageHead<L>, PayloadSize), dst: &mut BytesMut) -> Result<(), Self::Error> {
        let (mut head, payload_size) = item;
        let announces_empty_body = head.line().announces_empty_body();
        let headers = head.headers_mut();

        match payload_size {
            PayloadSize::Length(n) => {
                headers.remove(TRANSFER_ENCODING);
                headers.set(CONTENT_LENGTH, n.to_string()).map_err(SendError::invalid_body)?;
            }
            PayloadSize::Chunked => {
                headers.remove(CONTENT_LENGTH);
                headers.set(TRANSFER_ENCODING, "chunked").map_err(SendError::invalid_body)?;
            }
            PayloadSize::Empty => {
                headers.remove(TRANSFER_ENCODING);
                if announces_empty_body {
                    headers.set(CONTENT_LENGTH, "0").map_err(SendError::invalid_body)?;
                } else {
                    headers.remove(CONTENT_LENGTH);
                }
            }
            PayloadSize::UntilClose => {
                headers.remove(TRANSFER_ENCODING);
                headers.remove(CONTENT_LENGTH);
            }
        }

        dst.reserve(INIT_HEADER_SIZE);
        head.encode(dst);
        Ok(())
    }
}
