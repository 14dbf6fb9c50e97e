use std::io;

use http::StatusCode;
use thiserror::Error;

/// Any failure of the engine, on the reading or the writing side.
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("can't read message: {source}")]
    Parse {
        #[from]
        source: ParseError,
    },

    #[error("can't send message: {source}")]
    Send {
        #[from]
        source: SendError,
    },
}

/// Everything that can go wrong while reading a message off the wire.
///
/// Needing more bytes is not an error: decoders report it as `Ok(None)`.
/// Apart from [`ParseError::OversizedBody`] and [`ParseError::Io`], every variant
/// means the input broke the grammar and the connection can't be trusted anymore.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("line or head of {current_size} bytes is over the limit of {max_size}")]
    TooLargeHeader { current_size: usize, max_size: usize },

    #[error("more than {max_num} header fields")]
    TooManyHeaders { max_num: usize },

    #[error("malformed header field: {reason}")]
    InvalidHeader { reason: String },

    #[error("malformed start line: {reason}")]
    InvalidStartLine { reason: String },

    #[error("unsupported protocol version {0:?}")]
    InvalidVersion(String),

    #[error("malformed method")]
    InvalidMethod,

    #[error("malformed request target")]
    InvalidUri,

    #[error("malformed status code {0:?}")]
    InvalidStatus(String),

    #[error("bad content-length: {reason}")]
    InvalidContentLength { reason: String },

    #[error("bad transfer-encoding: {reason}")]
    InvalidTransferEncoding { reason: String },

    #[error("malformed chunk: {reason}")]
    InvalidChunk { reason: String },

    #[error("body of {size} bytes is over the limit of {max_size}")]
    OversizedBody { size: u64, max_size: u64 },

    #[error("connection closed in the middle of a message")]
    UnexpectedEof,

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl ParseError {
    pub fn too_large_header(current_size: usize, max_size: usize) -> Self {
        Self::TooLargeHeader { current_size, max_size }
    }

    pub fn too_many_headers(max_num: usize) -> Self {
        Self::TooManyHeaders { max_num }
    }

    pub fn invalid_header<S: ToString>(reason: S) -> Self {
        Self::InvalidHeader { reason: reason.to_string() }
    }

    pub fn invalid_start_line<S: ToString>(reason: S) -> Self {
        Self::InvalidStartLine { reason: reason.to_string() }
    }

    pub fn invalid_content_length<S: ToString>(reason: S) -> Self {
        Self::InvalidContentLength { reason: reason.to_string() }
    }

    pub fn invalid_transfer_encoding<S: ToString>(reason: S) -> Self {
        Self::InvalidTransferEncoding { reason: reason.to_string() }
    }

    pub fn invalid_chunk<S: ToString>(reason: S) -> Self {
        Self::InvalidChunk { reason: reason.to_string() }
    }

    pub fn oversized_body(size: u64, max_size: u64) -> Self {
        Self::OversizedBody { size, max_size }
    }

    /// Whether the message was well formed but larger than the configured limit.
    #[inline]
    pub fn is_oversized(&self) -> bool {
        matches!(self, ParseError::OversizedBody { .. })
    }

    /// The status a server should answer with before closing the connection.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ParseError::OversizedBody { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ParseError::TooLargeHeader { .. } | ParseError::TooManyHeaders { .. } => {
                StatusCode::REQUEST_HEADER_FIELDS_TOO_LARGE
            }
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

/// Misuse of the encoders, or a connection that can't take output anymore.
#[derive(Error, Debug)]
pub enum SendError {
    #[error("body doesn't match its framing: {reason}")]
    InvalidBody { reason: String },

    #[error("out of order message: {reason}")]
    UnexpectedMessage { reason: String },

    #[error("connection is closed")]
    Closed,

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl SendError {
    pub fn invalid_body<S: ToString>(reason: S) -> Self {
        Self::InvalidBody { reason: reason.to_string() }
    }

    pub fn unexpected_message<S: ToString>(reason: S) -> Self {
        Self::UnexpectedMessage { reason: reason.to_string() }
    }
}
