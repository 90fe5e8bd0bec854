//! Image payloads carried as `data:` URLs.
//!
//! Member photos, garment pictures and generated images all travel through
//! the system as base64 data URLs (`data:image/png;base64,...`). The
//! generative service wants the MIME type and the raw base64 payload as
//! separate fields, so this module splits and reassembles them.

use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine};
use thiserror::Error;

lazy_static::lazy_static! {
    static ref DATA_URL_REGEX: regex::Regex =
        regex::Regex::new(r"^data:([a-zA-Z0-9]+/[a-zA-Z0-9\-.+]+);base64,(.+)$").unwrap();
}

/// Error type for data URL operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DataUrlError {
    #[error("Invalid base64 string format")]
    InvalidFormat,
    #[error("Invalid base64 payload")]
    InvalidEncoding,
}

/// A parsed `data:<mime>;base64,<payload>` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrl {
    pub mime_type: String,
    /// Base64 payload, still encoded.
    pub data: String,
}

impl DataUrl {
    /// Parses a data URL into its MIME type and base64 payload.
    pub fn parse(input: &str) -> Result<Self, DataUrlError> {
        let caps = DATA_URL_REGEX
            .captures(input)
            .ok_or(DataUrlError::InvalidFormat)?;

        Ok(Self {
            mime_type: caps[1].to_string(),
            data: caps[2].to_string(),
        })
    }

    /// Builds a data URL from an already base64-encoded payload.
    pub fn new(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    /// Encodes raw bytes into a data URL.
    pub fn from_bytes(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: STANDARD.encode(bytes),
        }
    }

    /// Decodes the base64 payload back into bytes.
    pub fn decode(&self) -> Result<Vec<u8>, DataUrlError> {
        STANDARD
            .decode(self.data.as_bytes())
            .map_err(|_| DataUrlError::InvalidEncoding)
    }

    /// Whether the MIME type is an image type.
    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }
}

impl fmt::Display for DataUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "data:{};base64,{}", self.mime_type, self.data)
    }
}

/// Returns true when the string looks like a data URL (no full parse).
pub fn is_data_url(input: &str) -> bool {
    input.starts_with("data:")
}

/// Shortens an image reference for log output.
///
/// Data URLs can be megabytes long; only the leading characters are kept.
pub fn preview(input: &str) -> String {
    const PREVIEW_LEN: usize = 30;
    match input.char_indices().nth(PREVIEW_LEN) {
        Some((idx, _)) => format!("{}...", &input[..idx]),
        None => input.to_string(),
    }
}
