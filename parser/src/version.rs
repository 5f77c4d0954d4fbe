//! Representation of the negotiated HTTP version.

use std::fmt::Display;

use crate::h1::ParseError;

/// The HTTP version named on a request or status line.
///
/// `H2` and `H3` are recognized so that a version token is never mistaken for malformed input,
/// but this crate's [`h1`](crate::h1) request parser is HTTP/1.x only; a connection that observes
/// either variant has nothing further to parse from this crate and must fall back to whatever the
/// embedder does for those protocols, if anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    /// HTTP/1.0
    H1_0,
    /// HTTP/1.1
    H1_1,
    /// HTTP/2
    H2,
    /// HTTP/3
    H3,
}

impl Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::H1_0 => "HTTP/1.0",
            Self::H1_1 => "HTTP/1.1",
            Self::H2 => "HTTP/2",
            Self::H3 => "HTTP/3",
        })
    }
}

impl TryFrom<&[u8]> for Version {
    type Error = ParseError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        match value {
            b"HTTP/1.1" => Ok(Version::H1_1),
            b"HTTP/1.0" => Ok(Version::H1_0),
            b"HTTP/2" => Ok(Version::H2),
            b"HTTP/3" => Ok(Version::H3),
            _ => Err(ParseError::Version),
        }
    }
}
