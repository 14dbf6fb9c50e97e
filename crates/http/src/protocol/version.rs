use std::fmt;

use crate::protocol::ParseError;

/// The `HTTP/major.minor` part of a start line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HttpVersion {
    major: u8,
    minor: u8,
}

impl HttpVersion {
    pub const HTTP_10: HttpVersion = HttpVersion::new(1, 0);
    pub const HTTP_11: HttpVersion = HttpVersion::new(1, 1);

    pub const fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }

    pub fn major(&self) -> u8 {
        self.major
    }

    pub fn minor(&self) -> u8 {
        self.minor
    }

    /// Parses exactly `HTTP/<digit>.<digit>`.
    pub fn parse(bytes: &[u8]) -> Result<Self, ParseError> {
        match bytes {
            [b'H', b'T', b'T', b'P', b'/', major @ b'0'..=b'9', b'.', minor @ b'0'..=b'9'] => {
                Ok(Self::new(major - b'0', minor - b'0'))
            }
            _ => Err(ParseError::InvalidVersion(String::from_utf8_lossy(bytes).into_owned())),
        }
    }
}

impl Default for HttpVersion {
    fn default() -> Self {
        Self::HTTP_11
    }
}

impl fmt::Display for HttpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP/{}.{}", self.major, self.minor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_version() {
        assert_eq!(HttpVersion::parse(b"HTTP/1.1").unwrap(), HttpVersion::HTTP_11);
        assert_eq!(HttpVersion::parse(b"HTTP/1.0").unwrap(), HttpVersion::HTTP_10);
        assert_eq!(HttpVersion::parse(b"HTTP/2.0").unwrap(), HttpVersion::new(2, 0));
        assert!(HttpVersion::parse(b"HTTP/1").is_err());
        assert!(HttpVersion::parse(b"http/1.1").is_err());
        assert!(HttpVersion::parse(b"HTTP/1.10").is_err());
        assert_eq!(HttpVersion::HTTP_10.to_string(), "HTTP/1.0");
        assert!(HttpVersion::HTTP_10 < HttpVersion::HTTP_11);
    }
}
