//! HTTP message decoder module
//!
//! Assembles whole messages from a byte stream: a [`HeadParser`] reads the head,
//! then a [`PayloadDecoder`] chosen from the head reads the body. When the body
//! is complete the decoder starts over with the next message, so pipelined
//! messages on one connection decode one after the other.
//!
//! # Example
//!
//! ```
//! use bytes::BytesMut;
//! use strand_http::codec::RequestDecoder;
//! use strand_http::protocol::{BodyItem, Message};
//! use tokio_util::codec::Decoder;
//!
//! let mut decoder = RequestDecoder::default();
//! let mut buffer = BytesMut::from("POST /echo HTTP/1.1\r\nContent-Length: 2\r\n\r\nhi");
//!
//! let Some(Message::Header((head, _payload_size))) = decoder.decode(&mut buffer).unwrap() else { panic!() };
//! assert_eq!(head.uri(), "/echo");
//!
//! let Some(Message::Payload(BodyItem::Data(data))) = decoder.decode(&mut buffer).unwrap() else { panic!() };
//! assert_eq!(&data[..], b"hi");
//! ```

use bytes::BytesMut;
use tokio_util::codec::Decoder;
use tracing::{debug, trace};

use crate::codec::body::PayloadDecoder;
use crate::codec::header::HeadParser;
use crate::config::ParserConfig;
use crate::protocol::{BodyItem, Message, MessageHead, ParseError, PayloadSize, RequestLine, StartLine, StatusLine};

/// Decoder for requests.
pub type RequestDecoder = MessageDecoder<RequestLine>;

/// Decoder for responses.
pub type ResponseDecoder = MessageDecoder<StatusLine>;

#[derive(Debug, Clone)]
enum DecodeState {
    /// Reading a message head
    Head,
    /// Reading the body of the last head; an oversized declared length is
    /// reported on the first decode of this state
    Body { decoder: PayloadDecoder, oversized: Option<(u64, u64)> },
    /// A previous error was returned, nothing more is decoded
    Invalid,
}

/// A decoder for HTTP messages that handles both heads and payloads
///
/// Yields `Message::Header((head, payload_size))` first, then
/// `Message::Payload` items ending with `BodyItem::Eof`.
#[derive(Debug, Clone)]
pub struct MessageDecoder<L> {
    head_parser: HeadParser<L>,
    state: DecodeState,
    config: ParserConfig,
}

impl<L: StartLine> MessageDecoder<L> {
    pub fn new(config: ParserConfig) -> Self {
        Self { head_parser: HeadParser::new(config), state: DecodeState::Head, config }
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Whether the decoder rejected its input.
    pub fn is_invalid(&self) -> bool {
        matches!(self.state, DecodeState::Invalid)
    }

    /// Whether the decoder sits between two messages with nothing buffered.
    pub fn is_idle(&self) -> bool {
        matches!(self.state, DecodeState::Head) && self.head_parser.is_idle()
    }

    /// Forgets the message in progress, including an invalid state.
    pub fn reset(&mut self) {
        self.head_parser.reset();
        self.state = DecodeState::Head;
    }

    fn fail(&mut self, error: ParseError) -> ParseError {
        debug!(%error, "invalid message");
        self.state = DecodeState::Invalid;
        error
    }

    fn decode_head(&mut self, src: &mut BytesMut) -> Result<Option<<Self as Decoder>::Item>, ParseError> {
        let Some(head) = self.head_parser.decode(src)? else {
            return Ok(None);
        };

        let payload_size = L::payload_size(&head)?;
        let max_size = self.config.max_body_size;
        let oversized = match payload_size {
            PayloadSize::Length(length) if length > max_size => Some((length, max_size)),
            _ => None,
        };

        trace!(?payload_size, "decoded message head");
        self.state = DecodeState::Body { decoder: PayloadDecoder::new(payload_size, self.config), oversized };
        Ok(Some(Message::Header((head, payload_size))))
    }

    fn decode_body(
        &mut self,
        src: &mut BytesMut,
        eof: bool,
    ) -> Result<Option<<Self as Decoder>::Item>, ParseError> {
        let DecodeState::Body { decoder, oversized } = &mut self.state else {
            return Ok(None);
        };

        if let Some((size, max_size)) = oversized.take() {
            return Err(ParseError::oversized_body(size, max_size));
        }

        let item = if eof { decoder.decode_eof(src)? } else { decoder.decode(src)? };
        if let Some(BodyItem::Eof) = item {
            // no need payload decoder in this message now
            self.state = DecodeState::Head;
        }
        Ok(item.map(Message::Payload))
    }
}

impl<L: StartLine> Default for MessageDecoder<L> {
    fn default() -> Self {
        Self::new(ParserConfig::default())
    }
}

impl<L: StartLine> Decoder for MessageDecoder<L> {
    type Item = Message<(MessageHead<L>, PayloadSize), BodyItem>;
    type Error = ParseError;

    /// Attempts to decode the next head or payload item from the provided buffer
    ///
    /// # Returns
    ///
    /// - `Ok(Some(Message::Header(_)))`: a head was decoded
    /// - `Ok(Some(Message::Payload(_)))`: body data, a chunk, or the end of the body
    /// - `Ok(None)`: more data is needed, or the decoder is invalid
    /// - `Err(_)`: the input is malformed; the decoder turns invalid
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let result = match self.state {
            DecodeState::Head => self.decode_head(src),
            DecodeState::Body { .. } => self.decode_body(src, false),
            DecodeState::Invalid => return Ok(None),
        };
        result.map_err(|e| self.fail(e))
    }

    /// Called once the peer closed its side: only a close-delimited body may
    /// end here, anything else in flight is truncated.
    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let result = match self.state {
            DecodeState::Head => match self.decode_head(src) {
                Ok(None) if self.head_parser.is_idle() && src.is_empty() => Ok(None),
                Ok(None) => Err(ParseError::UnexpectedEof),
                other => other,
            },
            DecodeState::Body { .. } => self.decode_body(src, true),
            DecodeState::Invalid => return Ok(None),
        };
        result.map_err(|e| self.fail(e))
    }
}
