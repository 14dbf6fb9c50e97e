//! Resumable parser for a single `Name: value` header line.
//!
//! The parser consumes every byte it looks at and keeps the partial name and
//! value internally, so it can be fed arbitrarily fragmented input: a call that
//! returns `Ok(None)` has drained the buffer and the next call simply continues.
//!
//! # Grammar
//!
//! ```text
//! field-line = field-name ":" OWS field-value OWS CRLF
//! obs-fold   = (SP / HTAB) continuation CRLF
//! end        = CRLF
//! ```
//!
//! Bare LF line endings and folded continuation lines are accepted unless
//! [`ParserConfig::strict_crlf`] is set.

use bytes::{Buf, BytesMut};
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::config::ParserConfig;
use crate::ensure;
use crate::protocol::header::{is_field_value, is_token};
use crate::protocol::{HeaderField, ParseError};

/// What a complete line turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldItem {
    /// A new field.
    Field(HeaderField),
    /// A folded line continuing the value of the previous field.
    Continuation(String),
    /// The blank line closing the header section.
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldState {
    /// At the first byte of a line
    LineStart,
    /// Read LF of the blank line
    EndLf,
    /// Read the field name
    Name,
    /// Read the field value, or a folded continuation
    Value,
    /// Read LF after the value
    ValueLf,
}

/// Parses header lines one at a time, see the module documentation.
#[derive(Debug, Clone)]
pub struct FieldParser {
    state: FieldState,
    name: Vec<u8>,
    value: Vec<u8>,
    folding: bool,
    seen_field: bool,
    line_len: usize,
    config: ParserConfig,
}

impl FieldParser {
    pub fn new(config: ParserConfig) -> Self {
        Self {
            state: FieldState::LineStart,
            name: Vec::new(),
            value: Vec::new(),
            folding: false,
            seen_field: false,
            line_len: 0,
            config,
        }
    }

    /// Forgets everything, ready for a new header section.
    pub fn reset(&mut self) {
        self.state = FieldState::LineStart;
        self.name.clear();
        self.value.clear();
        self.folding = false;
        self.seen_field = false;
        self.line_len = 0;
    }

    /// Whether the parser is in the middle of a header section.
    pub fn is_idle(&self) -> bool {
        self.state == FieldState::LineStart && !self.seen_field
    }

    /// Handles one byte, returning an item when it completes a line.
    fn step(&mut self, b: u8) -> Result<Option<FieldItem>, ParseError> {
        let strict = self.config.strict_crlf;
        match self.state {
            FieldState::LineStart => match b {
                b'\r' => self.state = FieldState::EndLf,
                b'\n' => {
                    ensure!(!strict, ParseError::invalid_header("bare LF in header section"));
                    return Ok(Some(self.finish_section()));
                }
                b' ' | b'\t' => {
                    ensure!(!strict, ParseError::invalid_header("obsolete line folding"));
                    ensure!(self.seen_field, ParseError::invalid_header("continuation line before any field"));
                    self.folding = true;
                    self.state = FieldState::Value;
                }
                b if is_token(b) => {
                    self.name.push(b);
                    self.state = FieldState::Name;
                }
                b => return Err(ParseError::invalid_header(format!("invalid field name byte {b:#04x}"))),
            },

            FieldState::EndLf => match b {
                b'\n' => return Ok(Some(self.finish_section())),
                _ => return Err(ParseError::invalid_header("expected LF after CR of blank line")),
            },

            FieldState::Name => match b {
                b':' => self.state = FieldState::Value,
                b if is_token(b) => self.name.push(b),
                b' ' | b'\t' => return Err(ParseError::invalid_header("whitespace between field name and colon")),
                b'\r' | b'\n' => return Err(ParseError::invalid_header("field line without colon")),
                b => return Err(ParseError::invalid_header(format!("invalid field name byte {b:#04x}"))),
            },

            FieldState::Value => match b {
                b'\r' => self.state = FieldState::ValueLf,
                b'\n' => {
                    ensure!(!strict, ParseError::invalid_header("bare LF after field value"));
                    return self.finish_line().map(Some);
                }
                b if is_field_value(b) => self.value.push(b),
                b => return Err(ParseError::invalid_header(format!("invalid field value byte {b:#04x}"))),
            },

            FieldState::ValueLf => match b {
                b'\n' => return self.finish_line().map(Some),
                _ => return Err(ParseError::invalid_header("expected LF after CR of field line")),
            },
        }
        Ok(None)
    }

    fn finish_line(&mut self) -> Result<FieldItem, ParseError> {
        let value = String::from_utf8_lossy(&self.value);
        let value = value.trim_matches(|c| c == ' ' || c == '\t');

        let item = if self.folding {
            FieldItem::Continuation(value.to_owned())
        } else {
            // token bytes are ASCII
            let name = String::from_utf8_lossy(&self.name).into_owned();
            FieldItem::Field(HeaderField::new(name, value)?)
        };

        self.name.clear();
        self.value.clear();
        self.folding = false;
        self.seen_field = true;
        self.line_len = 0;
        self.state = FieldState::LineStart;
        Ok(item)
    }

    fn finish_section(&mut self) -> FieldItem {
        self.reset();
        FieldItem::End
    }
}

impl Decoder for FieldParser {
    type Item = FieldItem;
    type Error = ParseError;

    /// Consumes bytes until a line completes.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(item))` when a line completed, bytes after it are left in `src`
    /// - `Ok(None)` when `src` was drained without completing a line
    /// - `Err(_)` on a grammar violation or an over-long line
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let max_line_len = self.config.max_line_len;
        for index in 0..src.len() {
            self.line_len += 1;
            ensure!(self.line_len <= max_line_len, ParseError::too_large_header(self.line_len, max_line_len));

            if let Some(item) = self.step(src[index])? {
                src.advance(index + 1);
                trace!(?item, "parsed header line");
                return Ok(Some(item));
            }
        }

        src.clear();
        Ok(None)
    }
}
