use crate::codec::body::PayloadEncoder;
use crate::codec::header::HeadEncoder;
use crate::protocol::{Message, MessageHead, PayloadItem, PayloadSize, RequestLine, SendError, StartLine, StatusLine};
use bytes::{Buf, BytesMut};
use std::marker::PhantomData;
use tokio_util::codec::Encoder;
use tracing::error;

/// Encoder for responses.
pub type ResponseEncoder = MessageEncoder<StatusLine>;

/// Encoder for requests.
pub type RequestEncoder = MessageEncoder<RequestLine>;

/// Serializes a head followed by its body items.
///
/// The body strategy is taken from the [`PayloadSize`] sent with the head and
/// stays active until `Eof` (or a last chunk) ends the body. A head may also
/// follow a body that is already complete without an explicit `Eof`.
#[derive(Debug)]
pub struct MessageEncoder<L> {
    head_encoder: HeadEncoder,
    payload_encoder: Option<PayloadEncoder>,
    _line: PhantomData<fn(L)>,
}

impl<L: StartLine> MessageEncoder<L> {
    pub fn new() -> Self {
        Default::default()
    }

    /// Whether a body is still being written.
    pub fn in_body(&self) -> bool {
        self.payload_encoder.as_ref().is_some_and(|encoder| !encoder.is_finish())
    }
}

impl<L: StartLine> Default for MessageEncoder<L> {
    fn default() -> Self {
        Self { head_encoder: HeadEncoder, payload_encoder: None, _line: PhantomData }
    }
}

impl<L: StartLine, D: Buf> Encoder<Message<(MessageHead<L>, PayloadSize), PayloadItem<D>>> for MessageEncoder<L> {
    type Error = SendError;

    fn encode(&mut self, item: Message<(MessageHead<L>, PayloadSize), PayloadItem<D>>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match item {
            Message::Header((head, payload_size)) => {
                if self.in_body() {
                    error!("expect payload item but receive message head");
                    return Err(SendError::unexpected_message("message head while a body is in progress"));
                }

                self.payload_encoder = Some(PayloadEncoder::new(payload_size));
                self.head_encoder.encode((head, payload_size), dst)
            }

            Message::Payload(payload_item) => {
                let Some(payload_encoder) = &mut self.payload_encoder else {
                    error!("expect message head but receive payload item");
                    return Err(SendError::unexpected_message("payload item without a message head"));
                };

                let is_end = payload_item.is_eof();
                let result = payload_encoder.encode(payload_item, dst);
                if is_end {
                    self.payload_encoder.take();
                }

                result
            }
        }
    }
}
