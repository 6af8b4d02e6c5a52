//! Representation of the HTTP version.

use std::fmt::Display;

/// Requested or responded HTTP version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    /// HTTP/1.0
    H1_0,
    /// HTTP/1.1
    H1_1,
}

impl Version {
    /// Parses the version token that follows `"HTTP/"` in a request line.
    pub fn from_bytes(token: &[u8]) -> Option<Self> {
        match token {
            b"1.0" => Some(Self::H1_0),
            b"1.1" => Some(Self::H1_1),
            _ => None,
        }
    }

    /// Whether this version defaults to persistent connections absent a `Connection`
    /// header (HTTP/1.1 does; HTTP/1.0 does not).
    pub fn keep_alive_by_default(self) -> bool {
        matches!(self, Self::H1_1)
    }
}

impl Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::H1_0 => "HTTP/1.0",
            Self::H1_1 => "HTTP/1.1",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_versions() {
        assert_eq!(Some(Version::H1_1), Version::from_bytes(b"1.1"));
        assert_eq!(Some(Version::H1_0), Version::from_bytes(b"1.0"));
    }

    #[test]
    fn rejects_unknown_version() {
        assert_eq!(None, Version::from_bytes(b"2.0"));
    }

    #[test]
    fn only_h1_1_keeps_alive_by_default() {
        assert!(Version::H1_1.keep_alive_by_default());
        assert!(!Version::H1_0.keep_alive_by_default());
    }
}
