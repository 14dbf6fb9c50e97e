//! Limits and switches for the parsers and the connection driver.
//!
//! Both structs implement `Default` and `serde::Deserialize`; missing fields fall
//! back to their defaults, so a partial configuration file is enough.

use serde::Deserialize;

/// Limits enforced while parsing.
///
/// All sizes are in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Maximum length of a single start line, header line or chunk size line (default: 8 192).
    pub max_line_len: usize,
    /// Maximum size of a whole message head (default: 8 192).
    pub max_header_bytes: usize,
    /// Maximum number of header fields, and of trailer fields (default: 64).
    pub max_headers: usize,
    /// Maximum body size, declared or accumulated (default: 1 MiB).
    pub max_body_size: u64,
    /// Reject bare LF line endings and folded header lines (default: false).
    pub strict_crlf: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_line_len: 8 * 1024,
            max_header_bytes: 8 * 1024,
            max_headers: 64,
            max_body_size: 1024 * 1024,
            strict_crlf: false,
        }
    }
}

/// Per-connection behaviour of the [`ConnectionDriver`](crate::connection::ConnectionDriver).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub parser: ParserConfig,
    /// Collect a chunked request body and raise a single request event after the
    /// last chunk instead of one event per chunk (default: false).
    pub concatenate_chunks: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_uses_defaults() {
        let config: ConnectionConfig =
            serde_json::from_str(r#"{ "parser": { "max_body_size": 16, "strict_crlf": true } }"#).unwrap();

        assert_eq!(config.parser.max_body_size, 16);
        assert!(config.parser.strict_crlf);
        assert_eq!(config.parser.max_headers, 64);
        assert!(!config.concatenate_chunks);

        let config: ConnectionConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, ConnectionConfig::default());
    }
}
