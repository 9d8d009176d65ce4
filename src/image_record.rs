// image_record.rs - normalized image records produced by the capture adapters
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::data_url::{self, DataUrlError};
use crate::wire::SourceImage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Uploaded,
    Captured,
    Drawn,
    Generated,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SourceKind::Uploaded  => "uploaded",
            SourceKind::Captured  => "captured",
            SourceKind::Drawn     => "drawn",
            SourceKind::Generated => "generated",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageId(Uuid);

impl ImageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ImageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for ImageId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// A record that has not been given an id yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewImage {
    pub source:    SourceKind,
    /// Base64, no data: prefix
    pub payload:   String,
    pub mime_type: String,
}

impl NewImage {
    pub fn from_bytes(source: SourceKind, mime_type: &str, bytes: &[u8]) -> Self {
        use base64::{engine::general_purpose, Engine};
        Self {
            source,
            payload:   general_purpose::STANDARD.encode(bytes),
            mime_type: mime_type.to_string(),
        }
    }

    /// MIME type comes from the data URL itself; `image/png` when absent.
    pub fn from_data_url(source: SourceKind, url: &str) -> Result<Self, DataUrlError> {
        let parsed = data_url::parse(url)?;
        let mime_type = if parsed.mime_type.is_empty() { "image/png" } else { parsed.mime_type };
        Ok(Self { source, payload: parsed.payload.to_string(), mime_type: mime_type.to_string() })
    }
}

/// Immutable once created; edits produce a new record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRecord {
    id:        ImageId,
    source:    SourceKind,
    payload:   String,
    mime_type: String,
}

impl ImageRecord {
    pub(crate) fn assign(id: ImageId, image: NewImage) -> Self {
        Self { id, source: image.source, payload: image.payload, mime_type: image.mime_type }
    }

    pub fn id(&self) -> ImageId {
        self.id
    }

    pub fn source(&self) -> SourceKind {
        self.source
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn data_url(&self) -> String {
        data_url::encode(&self.mime_type, &self.payload)
    }

    pub fn to_source_image(&self) -> SourceImage {
        SourceImage { data_url: self.data_url(), mime_type: self.mime_type.clone() }
    }

    /// Approximate decoded size in bytes.
    pub fn byte_len(&self) -> usize {
        self.payload.len() / 4 * 3
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_bytes_encodes_base64() {
        let img = NewImage::from_bytes(SourceKind::Uploaded, "image/png", b"\x89PNG");
        assert_eq!(img.payload, "iVBORw==");
        assert_eq!(img.mime_type, "image/png");
    }

    #[test]
    fn test_from_data_url_keeps_mime() {
        let img = NewImage::from_data_url(SourceKind::Drawn, "data:image/webp;base64,UklGRg==").unwrap();
        assert_eq!(img.mime_type, "image/webp");
        assert_eq!(img.payload, "UklGRg==");
        assert_eq!(img.source, SourceKind::Drawn);
    }

    #[test]
    fn test_record_data_url_and_wire_form() {
        let rec = ImageRecord::assign(ImageId::new(), NewImage::from_bytes(SourceKind::Captured, "image/jpeg", b"abc"));
        assert_eq!(rec.data_url(), "data:image/jpeg;base64,YWJj");
        let wire = rec.to_source_image();
        assert_eq!(wire.mime_type, "image/jpeg");
        assert_eq!(wire.data_url, rec.data_url());
    }

    #[test]
    fn test_image_id_parses_back() {
        let id = ImageId::new();
        let parsed: ImageId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
        assert!("not-an-id".parse::<ImageId>().is_err());
    }

    #[test]
    fn test_source_kind_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&SourceKind::Generated).unwrap(), "\"generated\"");
        assert_eq!(SourceKind::Captured.to_string(), "captured");
    }
}
