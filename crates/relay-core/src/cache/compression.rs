//! Payload compression for cache entries.
//!
//! The store only holds text, so compressed payloads are written as base64 of a gzip stream.
//! Reading auto-detects the encoding: text starting with a JSON delimiter is taken as-is,
//! anything else is inflated. An entry that can be neither is handed back unchanged as
//! [`Decoded::Fallback`] so the caller can log it and treat it as a miss.

use base64::{engine::general_purpose::STANDARD as BASE64_ENGINE, Engine as _};
use flate2::{read::GzDecoder, write::GzEncoder, Compression};
use std::{
    borrow::Cow,
    io::{Read, Write},
};
use thiserror::Error;

/// Payloads shorter than this are stored uncompressed.
pub const DEFAULT_MIN_COMPRESS_SIZE: usize = 1024;

#[derive(Debug, Error)]
pub enum CompressionError {
    #[error("gzip stream error: {0}")]
    Io(#[from] std::io::Error),

    #[error("base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("inflated payload is not utf-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

#[must_use]
pub fn should_compress(text: &str, min_size: usize) -> bool {
    text.len() >= min_size
}

/// Gzips `text`.
///
/// # Errors
///
/// Returns [`CompressionError::Io`] if the encoder fails.
pub fn compress(text: &str) -> Result<Vec<u8>, CompressionError> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(text.len() / 4), Compression::default());
    encoder.write_all(text.as_bytes())?;
    Ok(encoder.finish()?)
}

/// Inflates a gzip stream back to text.
///
/// # Errors
///
/// Returns an error if the stream is corrupt or does not inflate to UTF-8.
pub fn decompress(bytes: &[u8]) -> Result<String, CompressionError> {
    let mut decoder = GzDecoder::new(bytes);
    let mut inflated = Vec::with_capacity(bytes.len() * 4);
    decoder.read_to_end(&mut inflated)?;
    Ok(String::from_utf8(inflated)?)
}

/// Compresses and base64-encodes `text` for the store.
///
/// # Errors
///
/// Returns [`CompressionError::Io`] if the encoder fails.
pub fn encode_for_store(text: &str) -> Result<String, CompressionError> {
    compress(text).map(|bytes| BASE64_ENGINE.encode(bytes))
}

/// Outcome of reading a stored value.
#[derive(Debug)]
pub enum Decoded<'a> {
    /// The value was raw JSON.
    Plain(&'a str),
    /// The value was base64 gzip and inflated cleanly.
    Inflated(String),
    /// The value was neither; the raw text is returned untouched.
    Fallback { raw: &'a str, error: CompressionError },
}

impl<'a> Decoded<'a> {
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }

    #[must_use]
    pub fn into_text(self) -> Cow<'a, str> {
        match self {
            Self::Plain(s) | Self::Fallback { raw: s, .. } => Cow::Borrowed(s),
            Self::Inflated(s) => Cow::Owned(s),
        }
    }
}

/// Decodes a value read from the store.
#[must_use]
pub fn decode_from_store(stored: &str) -> Decoded<'_> {
    if looks_like_json(stored) {
        return Decoded::Plain(stored);
    }

    match BASE64_ENGINE.decode(stored.trim()) {
        Ok(bytes) => match decompress(&bytes) {
            Ok(text) => Decoded::Inflated(text),
            Err(error) => Decoded::Fallback { raw: stored, error },
        },
        Err(error) => Decoded::Fallback { raw: stored, error: error.into() },
    }
}

fn looks_like_json(text: &str) -> bool {
    matches!(text.trim_start().as_bytes().first(), Some(b'{' | b'['))
}
