//! Body delimited by Content-Length ([RFC 9112 Section 6.2](https://www.rfc-editor.org/rfc/rfc9112#section-6.2)).

use bytes::BytesMut;
use tokio_util::codec::Decoder;

use crate::protocol::{BodyItem, ParseError};

/// Yields the next `remaining` bytes as [`BodyItem::Data`], then [`BodyItem::Eof`].
///
/// Bytes past the declared length stay in the buffer for the next message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LengthDecoder {
    remaining: u64,
}

impl LengthDecoder {
    pub fn new(length: u64) -> Self {
        Self { remaining: length }
    }

    /// Body bytes not read yet.
    pub fn remaining(&self) -> u64 {
        self.remaining
    }
}

impl Decoder for LengthDecoder {
    type Item = BodyItem;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if self.remaining == 0 {
            return Ok(Some(BodyItem::Eof));
        }
        if src.is_empty() {
            return Ok(None);
        }

        let take = usize::try_from(self.remaining).map_or(src.len(), |remaining| remaining.min(src.len()));
        let data = src.split_to(take).freeze();
        self.remaining -= data.len() as u64;
        Ok(Some(BodyItem::Data(data)))
    }

    /// A connection closing before the declared length arrived truncates the body.
    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        self.decode(src)?.map_or(Err(ParseError::UnexpectedEof), |item| Ok(Some(item)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic() {
        let mut buffer = BytesMut::from(&b"101234567890abcdef\r\n\r\n"[..]);
        let mut decoder = LengthDecoder::new(10);

        let item = decoder.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(&item.as_bytes().unwrap()[..], b"1012345678");
        assert_eq!(&buffer[..], b"90abcdef\r\n\r\n");
        assert_eq!(decoder.remaining(), 0);

        assert!(decoder.decode(&mut buffer).unwrap().unwrap().is_eof());
        assert_eq!(buffer.len(), 12);
    }

    #[test]
    fn data_across_calls() {
        let mut decoder = LengthDecoder::new(6);

        let mut first = BytesMut::from(&b"abc"[..]);
        assert_eq!(&decoder.decode(&mut first).unwrap().unwrap().as_bytes().unwrap()[..], b"abc");
        assert!(decoder.decode(&mut first).unwrap().is_none());

        let mut second = BytesMut::from(&b"defGET"[..]);
        assert_eq!(&decoder.decode(&mut second).unwrap().unwrap().as_bytes().unwrap()[..], b"def");
        assert!(decoder.decode(&mut second).unwrap().unwrap().is_eof());
        assert_eq!(&second[..], b"GET");
    }

    #[test]
    fn truncated_body() {
        let mut decoder = LengthDecoder::new(4);
        let mut buffer = BytesMut::from(&b"ab"[..]);

        assert!(decoder.decode(&mut buffer).unwrap().is_some());
        assert_eq!(decoder.remaining(), 2);
        assert!(matches!(decoder.decode_eof(&mut buffer), Err(ParseError::UnexpectedEof)));
    }
}
