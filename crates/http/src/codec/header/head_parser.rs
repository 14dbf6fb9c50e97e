//! Incremental parser for a complete message head
//!
//! Reads the start line, then delegates every following line to a
//! [`FieldParser`] until the blank line. Works for both request and response
//! heads through the [`StartLine`] trait.
//!
//! # Limits
//!
//! All limits come from [`ParserConfig`]:
//!
//! - `max_line_len`: start line and every field line
//! - `max_header_bytes`: the head as a whole, start line included
//! - `max_headers`: number of fields
//!
//! Empty lines before the start line are skipped.

use bytes::{Buf, BytesMut};
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::codec::header::{FieldItem, FieldParser};
use crate::config::ParserConfig;
use crate::ensure;
use crate::protocol::{Headers, MessageHead, ParseError, StartLine};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HeadState {
    StartLine,
    Fields,
}

/// Decoder turning raw bytes into a [`MessageHead`].
///
/// Like every parser in this crate it consumes all bytes it inspects, so a
/// head split over many reads is assembled without re-scanning.
#[derive(Debug, Clone)]
pub struct HeadParser<L> {
    state: HeadState,
    line: Vec<u8>,
    start_line: Option<L>,
    headers: Headers,
    fields: FieldParser,
    head_bytes: usize,
    config: ParserConfig,
}

impl<L: StartLine> HeadParser<L> {
    pub fn new(config: ParserConfig) -> Self {
        Self {
            state: HeadState::StartLine,
            line: Vec::new(),
            start_line: None,
            headers: Headers::new(),
            fields: FieldParser::new(config),
            head_bytes: 0,
            config,
        }
    }

    /// Drops any partially parsed head.
    pub fn reset(&mut self) {
        self.state = HeadState::StartLine;
        self.line.clear();
        self.start_line = None;
        self.headers = Headers::new();
        self.fields.reset();
        self.head_bytes = 0;
    }

    /// Whether no byte of a head has been seen yet.
    pub fn is_idle(&self) -> bool {
        self.state == HeadState::StartLine && self.line.is_empty()
    }

    fn count_bytes(&mut self, n: usize) -> Result<(), ParseError> {
        self.head_bytes += n;
        let max_size = self.config.max_header_bytes;
        ensure!(self.head_bytes <= max_size, ParseError::too_large_header(self.head_bytes, max_size));
        Ok(())
    }

    /// Returns `true` once the start line is complete.
    fn decode_start_line(&mut self, src: &mut BytesMut) -> Result<bool, ParseError> {
        let max_line_len = self.config.max_line_len;
        let mut consumed = 0;
        let mut skipped = 0;
        let mut complete = false;

        for &b in src.iter() {
            consumed += 1;
            if self.line.is_empty() && (b == b'\r' || b == b'\n') {
                // blank lines ahead of a message are ignored, but count toward the head
                skipped += 1;
                continue;
            }
            if b == b'\n' {
                complete = true;
                break;
            }
            self.line.push(b);
            ensure!(self.line.len() <= max_line_len, ParseError::too_large_header(self.line.len(), max_line_len));
        }

        src.advance(consumed);
        self.count_bytes(skipped)?;
        if !complete {
            return Ok(false);
        }
        self.count_bytes(self.line.len() + 1)?;

        match self.line.last() {
            Some(b'\r') => {
                self.line.pop();
            }
            _ => ensure!(!self.config.strict_crlf, ParseError::invalid_start_line("bare LF after start line")),
        }

        let line = L::parse(&self.line)?;
        trace!(start_line = %line, "parsed start line");
        self.start_line = Some(line);
        self.line.clear();
        Ok(true)
    }

    fn decode_fields(&mut self, src: &mut BytesMut) -> Result<Option<MessageHead<L>>, ParseError> {
        loop {
            let before = src.len();
            let item = self.fields.decode(src)?;
            self.count_bytes(before - src.len())?;

            match item {
                Some(FieldItem::Field(field)) => {
                    ensure!(self.headers.len() < self.config.max_headers, ParseError::too_many_headers(self.config.max_headers));
                    self.headers.add(field);
                }
                Some(FieldItem::Continuation(continuation)) => {
                    let field = self.headers.last_mut().ok_or_else(|| ParseError::invalid_header("continuation line before any field"))?;
                    field.append_continuation(&continuation);
                }
                Some(FieldItem::End) => {
                    let line = self.start_line.take().ok_or_else(|| ParseError::invalid_start_line("missing start line"))?;
                    let headers = std::mem::take(&mut self.headers);
                    self.reset();
                    return Ok(Some(MessageHead::new(line, headers)));
                }
                None => return Ok(None),
            }
        }
    }
}

impl<L: StartLine> Decoder for HeadParser<L> {
    type Item = MessageHead<L>;
    type Error = ParseError;

    /// Attempts to decode a message head from the provided bytes buffer.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(head))` once the blank line ending the head was read; the body
    ///   (or the next message) stays in `src`
    /// - `Ok(None)` if more data is needed, `src` is then empty
    /// - `Err(ParseError)` if the head is malformed or exceeds a limit
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if self.state == HeadState::StartLine {
            if !self.decode_start_line(src)? {
                return Ok(None);
            }
            self.state = HeadState::Fields;
        }

        let head = self.decode_fields(src)?;
        if let Some(head) = &head {
            trace!(fields = head.headers().len(), "parsed message head");
        }
        Ok(head)
    }
}
