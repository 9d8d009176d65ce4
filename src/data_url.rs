// data_url.rs - `data:<mime>;base64,<payload>` helpers shared by relay and client
use base64::{engine::general_purpose, Engine};
use thiserror::Error;

/// Prefix applied to images handed back by the relay.
pub const PNG_PREFIX: &str = "data:image/png;base64,";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DataUrlError {
    #[error("image data is not a data URL (missing ',' separator)")]
    MissingSeparator,
    #[error("image payload is not valid base64: {0}")]
    InvalidBase64(String),
}

/// Borrowed view over a data URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataUrl<'a> {
    /// MIME type declared in the metadata section, empty when absent.
    pub mime_type: &'a str,
    /// Everything after the first comma.
    pub payload:   &'a str,
}

/// Split a data URL at its first comma. The metadata section is read
/// leniently: anything up to the first `;` after `data:` is the MIME type.
pub fn parse(s: &str) -> Result<DataUrl<'_>, DataUrlError> {
    let (meta, payload) = s.split_once(',').ok_or(DataUrlError::MissingSeparator)?;
    let meta = meta.strip_prefix("data:").unwrap_or(meta);
    let mime_type = meta.split(';').next().unwrap_or("");
    Ok(DataUrl { mime_type, payload })
}

/// Payload only; this is what goes upstream to the provider.
pub fn strip(s: &str) -> Result<&str, DataUrlError> {
    parse(s).map(|d| d.payload)
}

pub fn encode(mime_type: &str, payload: &str) -> String {
    format!("data:{};base64,{}", mime_type, payload)
}

pub fn png(payload: &str) -> String {
    format!("{}{}", PNG_PREFIX, payload)
}

pub fn encode_bytes(mime_type: &str, bytes: &[u8]) -> String {
    encode(mime_type, &general_purpose::STANDARD.encode(bytes))
}

pub fn decode_payload(payload: &str) -> Result<Vec<u8>, DataUrlError> {
    general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| DataUrlError::InvalidBase64(e.to_string()))
}

// ── Tests ─────────────────────────────────────────────────────────────────
