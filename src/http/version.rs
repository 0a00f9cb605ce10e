//! Http version.

use std::fmt::{Display, Formatter};

use crate::error::MessageError;

/// HTTP/1.0 or HTTP/1.1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Version {
    Http10,
    Http11,
}

impl Version {
    /// Parse from the minor version reported by httparse.
    #[inline]
    pub const fn from_minor(v: u8) -> Result<Self, MessageError> {
        match v {
            0 => Ok(Version::Http10),
            1 => Ok(Version::Http11),
            _ => Err(MessageError::HttpVersion),
        }
    }

    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Version::Http10 => "HTTP/1.0",
            Version::Http11 => "HTTP/1.1",
        }
    }

    /// Whether connections stay open unless told otherwise.
    #[inline]
    pub const fn keeps_alive(self) -> bool { matches!(self, Version::Http11) }

    /// Whether chunked transfer encoding may be used.
    #[inline]
    pub const fn supports_chunked(self) -> bool { matches!(self, Version::Http11) }
}

impl Default for Version {
    fn default() -> Self { Version::Http11 }
}

impl Display for Version {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result { f.write_str(self.as_str()) }
}
