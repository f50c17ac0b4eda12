//! Content-encoding body decoding.
//!
//! Pure byte-in/byte-out decoding of response bodies before they are
//! rendered into audit entries. Decoding never touches the bytes relayed to
//! the client; a decode failure degrades the audit record, nothing else.

use std::io::Read;

use thiserror::Error;

/// The declared content-encoding of a body, parsed from the response header.
///
/// Dispatch over this enum is exhaustive: every supported encoding has a
/// variant, and everything else lands in `Unknown` and passes through raw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentEncoding {
    Identity,
    Gzip,
    Deflate,
    Brotli,
    Unknown(String),
}

impl ContentEncoding {
    /// Parse a `content-encoding` header value. A missing header is
    /// `Identity`.
    pub fn from_header(value: Option<&str>) -> Self {
        match value {
            None => ContentEncoding::Identity,
            Some(v) => Self::parse(v),
        }
    }

    fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "identity" => ContentEncoding::Identity,
            "gzip" | "x-gzip" => ContentEncoding::Gzip,
            "deflate" => ContentEncoding::Deflate,
            "br" => ContentEncoding::Brotli,
            other => ContentEncoding::Unknown(other.to_string()),
        }
    }

    /// Stable label for error messages.
    pub fn label(&self) -> &str {
        match self {
            ContentEncoding::Identity => "identity",
            ContentEncoding::Gzip => "gzip",
            ContentEncoding::Deflate => "deflate",
            ContentEncoding::Brotli => "br",
            ContentEncoding::Unknown(other) => other,
        }
    }
}

/// A body failed to decode under its declared encoding.
#[derive(Debug, Error)]
#[error("{encoding} decode failed: {source}")]
pub struct DecodeError {
    encoding: String,
    #[source]
    source: std::io::Error,
}

/// Decode `bytes` according to the declared encoding.
///
/// An empty body decodes to an empty body for every variant. `Identity` and
/// `Unknown` pass the bytes through untouched.
pub fn decode(encoding: &ContentEncoding, bytes: &[u8]) -> Result<Vec<u8>, DecodeError> {
    if bytes.is_empty() {
        return Ok(Vec::new());
    }

    let fail = |source| DecodeError {
        encoding: encoding.label().to_string(),
        source,
    };

    match encoding {
        ContentEncoding::Identity | ContentEncoding::Unknown(_) => Ok(bytes.to_vec()),
        ContentEncoding::Gzip => {
            let mut decoded = Vec::new();
            flate2::read::GzDecoder::new(bytes)
                .read_to_end(&mut decoded)
                .map_err(fail)?;
            Ok(decoded)
        }
        ContentEncoding::Deflate => {
            // HTTP "deflate" is the zlib-wrapped format (RFC 9110 §8.4.1.1).
            let mut decoded = Vec::new();
            flate2::read::ZlibDecoder::new(bytes)
                .read_to_end(&mut decoded)
                .map_err(fail)?;
            Ok(decoded)
        }
        ContentEncoding::Brotli => {
            let mut decoded = Vec::new();
            brotli::Decompressor::new(bytes, 4096)
                .read_to_end(&mut decoded)
                .map_err(fail)?;
            Ok(decoded)
        }
    }
}
