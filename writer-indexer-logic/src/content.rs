//! Versioned content envelopes stored on-chain by writer storage contracts.
//!
//! `br:<base64>` carries brotli-compressed utf-8 text. `enc:br:<payload>` is
//! compressed and then encrypted for the reader, so only the raw value is kept.
//! Anything else is opaque.

use base64::{Engine, engine::general_purpose::STANDARD};
use std::io::{Read, Write};
use thiserror::Error;

pub const BROTLI_PREFIX: &str = "br:";
pub const ENCRYPTED_BROTLI_PREFIX: &str = "enc:br:";

pub const BROTLI_VERSION: &str = "br";
pub const ENCRYPTED_BROTLI_VERSION: &str = "enc:br";

const BROTLI_BUFFER_SIZE: usize = 4096;
const BROTLI_QUALITY: u32 = 11;
const BROTLI_WINDOW: u32 = 22;

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("invalid brotli stream: {0}")]
    Brotli(#[from] std::io::Error),
    #[error("decompressed content is not utf-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NormalizedContent {
    pub version: Option<String>,
    pub content: Option<String>,
}

pub fn normalize(raw: &str) -> Result<NormalizedContent, ContentError> {
    if raw.starts_with(ENCRYPTED_BROTLI_PREFIX) {
        return Ok(NormalizedContent {
            version: Some(ENCRYPTED_BROTLI_VERSION.to_string()),
            content: None,
        });
    }

    if let Some(payload) = raw.strip_prefix(BROTLI_PREFIX) {
        let compressed = STANDARD.decode(payload.trim())?;
        let mut decompressed = Vec::new();
        brotli::Decompressor::new(compressed.as_slice(), BROTLI_BUFFER_SIZE)
            .read_to_end(&mut decompressed)?;
        return Ok(NormalizedContent {
            version: Some(BROTLI_VERSION.to_string()),
            content: Some(String::from_utf8(decompressed)?),
        });
    }

    Ok(NormalizedContent::default())
}

/// Builds a `br:` envelope for `text`.
pub fn compress(text: &str) -> Result<String, ContentError> {
    let mut compressed = Vec::new();
    {
        let mut writer = brotli::CompressorWriter::new(
            &mut compressed,
            BROTLI_BUFFER_SIZE,
            BROTLI_QUALITY,
            BROTLI_WINDOW,
        );
        writer.write_all(text.as_bytes())?;
        writer.flush()?;
    }
    Ok(format!("{BROTLI_PREFIX}{}", STANDARD.encode(compressed)))
}
