//! Content-Encoding negotiation

use std::fmt;

/// Supported response encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentEncoding {
    /// Brotli
    Brotli,
    /// Gzip
    Gzip,
    /// Deflate (zlib framing, as HTTP defines it)
    Deflate,
}

impl ContentEncoding {
    /// Encodings in the order they are preferred
    pub const PRIORITY: [ContentEncoding; 3] = [
        ContentEncoding::Brotli,
        ContentEncoding::Gzip,
        ContentEncoding::Deflate,
    ];

    /// Get the Content-Encoding header value
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Brotli => "br",
            Self::Gzip => "gzip",
            Self::Deflate => "deflate",
        }
    }

    /// Pick an encoding from an Accept-Encoding header value
    ///
    /// Tokens are matched by substring presence, not parsed: `q` values are
    /// ignored and the first hit in [`ContentEncoding::PRIORITY`] wins.
    pub fn negotiate(accept_encoding: &str) -> Option<Self> {
        let accept = accept_encoding.to_ascii_lowercase();
        Self::PRIORITY
            .into_iter()
            .find(|encoding| accept.contains(encoding.as_str()))
    }
}

impl fmt::Display for ContentEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
