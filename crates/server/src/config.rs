use serde::Deserialize;
use strand_http::config::ConnectionConfig;

/// Settings of an [`HttpServer`](crate::HttpServer).
///
/// Missing fields fall back to their defaults when deserialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Protocol settings applied to every accepted connection.
    pub connection: ConnectionConfig,
    /// Initial size of each connection's read buffer (default: 8 192).
    pub read_buffer_size: usize,
    /// Set `TCP_NODELAY` on accepted sockets (default: true).
    pub nodelay: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { connection: ConnectionConfig::default(), read_buffer_size: 8 * 1024, nodelay: true }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_limits() {
        let config: ServerConfig =
            serde_json::from_str(r#"{ "nodelay": false, "connection": { "parser": { "max_headers": 8 } } }"#).unwrap();

        assert!(!config.nodelay);
        assert_eq!(config.read_buffer_size, 8 * 1024);
        assert_eq!(config.connection.parser.max_headers, 8);
        assert_eq!(config.connection.parser.max_body_size, 1024 * 1024);
    }
}
