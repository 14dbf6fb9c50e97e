//! Parser for the size line that opens every chunk of a chunked body.
//!
//! ```text
//! chunk-size-line = 1*16HEXDIG [ OWS ] [ ";" OWS chunk-ext ] CRLF
//! ```
//!
//! The hex digits are kept verbatim next to the numeric size, and the
//! extension is kept as raw text (leading whitespace skipped, everything up to
//! the line end). A bare LF ends the line unless [`ParserConfig::strict_crlf`]
//! is set.
//!
//! The parser consumes every byte it inspects, so feeding the line one byte at
//! a time yields the same [`ChunkHeader`] as feeding it whole.

use bytes::{Buf, BytesMut};
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::config::ParserConfig;
use crate::ensure;
use crate::protocol::{ChunkHeader, ParseError};
use ChunkHeaderState::*;

/// Hex digits that still fit into a `u64`
const MAX_HEX_DIGITS: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChunkHeaderState {
    /// Read the first hex digit
    Start,
    /// Read further hex digits
    Digits,
    /// Handle whitespace after the size
    SizeLws,
    /// Skip whitespace after the semicolon
    ExtensionLws,
    /// Read the extension text
    Extension,
    /// Read LF after CR
    SizeLf,
}

/// Decoder for one chunk size line, see the module documentation.
#[derive(Debug, Clone)]
pub struct ChunkHeaderParser {
    state: ChunkHeaderState,
    hex_size: String,
    size: u64,
    extension: Vec<u8>,
    line_len: usize,
    config: ParserConfig,
}

impl ChunkHeaderParser {
    pub fn new(config: ParserConfig) -> Self {
        Self { state: Start, hex_size: String::new(), size: 0, extension: Vec::new(), line_len: 0, config }
    }

    pub fn reset(&mut self) {
        self.state = Start;
        self.hex_size.clear();
        self.size = 0;
        self.extension.clear();
        self.line_len = 0;
    }

    /// Handles one byte, returning `true` once the line is complete.
    fn step(&mut self, b: u8) -> Result<bool, ParseError> {
        let lenient = !self.config.strict_crlf;
        self.state = match (self.state, b) {
            (Start, b) if b.is_ascii_hexdigit() => self.push_digit(b)?,
            (Start, _) => return Err(ParseError::invalid_chunk("chunk size line must start with a hex digit")),

            (Digits, b) if b.is_ascii_hexdigit() => self.push_digit(b)?,
            (Digits | SizeLws, b' ' | b'\t') => SizeLws,
            (Digits | SizeLws, b';') => ExtensionLws,
            (Digits | SizeLws, _) if b != b'\r' && b != b'\n' => {
                return Err(ParseError::invalid_chunk(format!("invalid byte {b:#04x} in chunk size")));
            }

            (ExtensionLws, b' ' | b'\t') => ExtensionLws,
            (ExtensionLws | Extension, b) if b != b'\r' && b != b'\n' => {
                ensure!(b == b'\t' || !b.is_ascii_control(), ParseError::invalid_chunk("control byte in chunk extension"));
                self.extension.push(b);
                Extension
            }

            (Digits | SizeLws | ExtensionLws | Extension, b'\r') => SizeLf,
            (Digits | SizeLws | ExtensionLws | Extension, _) => {
                // a bare LF
                ensure!(lenient, ParseError::invalid_chunk("bare LF after chunk size"));
                return Ok(true);
            }

            (SizeLf, b'\n') => return Ok(true),
            (SizeLf, _) => return Err(ParseError::invalid_chunk("expected LF after CR of chunk size line")),
        };
        Ok(false)
    }

    fn push_digit(&mut self, b: u8) -> Result<ChunkHeaderState, ParseError> {
        ensure!(self.hex_size.len() < MAX_HEX_DIGITS, ParseError::invalid_chunk("chunk size overflows"));
        // is_ascii_hexdigit was checked by the caller
        let digit = (b as char).to_digit(16).unwrap_or_default();
        self.size = (self.size << 4) | u64::from(digit);
        self.hex_size.push(b as char);
        Ok(Digits)
    }

    fn take_header(&mut self) -> ChunkHeader {
        let hex_size = std::mem::take(&mut self.hex_size);
        let extension = String::from_utf8_lossy(&self.extension).into_owned();
        let header = ChunkHeader::from_parts(hex_size, self.size, extension);
        self.reset();
        header
    }
}

impl Decoder for ChunkHeaderParser {
    type Item = ChunkHeader;
    type Error = ParseError;

    /// Consumes bytes until the size line is complete.
    ///
    /// # Returns
    /// - `Ok(Some(header))` when the line ended, following bytes stay in `src`
    /// - `Ok(None)` when `src` was drained first
    /// - `Err(ParseError)` if the line is malformed or too long
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let max_line_len = self.config.max_line_len;
        for index in 0..src.len() {
            self.line_len += 1;
            ensure!(self.line_len <= max_line_len, ParseError::too_large_header(self.line_len, max_line_len));

            if self.step(src[index])? {
                src.advance(index + 1);
                let header = self.take_header();
                trace!(size = header.size(), extension = header.extension(), "parsed chunk header");
                return Ok(Some(header));
            }
        }

        src.clear();
        Ok(None)
    }
}
