//! Data URIs and local image upload.

use crate::error::{PosterError, Result};
use crate::image::ImageFormat;
use base64::Engine;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// An embeddable `data:<mime>;base64,<payload>` value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri {
    /// Declared media type, e.g. `image/png`.
    pub mime_type: String,
    /// Base64 payload without the prefix.
    pub data: String,
}

impl DataUri {
    /// Encodes raw bytes under the given media type.
    pub fn from_bytes(bytes: &[u8], mime_type: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
        }
    }

    /// Parses a data URI.
    ///
    /// Embedded whitespace is stripped so wrapped payloads are accepted.
    pub fn parse(input: &str) -> Result<Self> {
        let rest = input
            .trim()
            .strip_prefix("data:")
            .ok_or_else(|| PosterError::Decode("not a data URI".into()))?;
        let (mime_type, payload) = rest
            .split_once(";base64,")
            .ok_or_else(|| PosterError::Decode("data URI is not base64 encoded".into()))?;
        if mime_type.is_empty() {
            return Err(PosterError::Decode("data URI has no media type".into()));
        }
        let data: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        Ok(Self {
            mime_type: mime_type.to_string(),
            data,
        })
    }

    /// Decodes the payload, accepting missing padding.
    pub fn decode(&self) -> Result<Vec<u8>> {
        base64::engine::general_purpose::STANDARD
            .decode(&self.data)
            .or_else(|_| base64::engine::general_purpose::STANDARD_NO_PAD.decode(&self.data))
            .map_err(|e| PosterError::Decode(e.to_string()))
    }

    /// Returns true when the media type is an image type.
    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }

    /// Returns true when the media type is a video type.
    pub fn is_video(&self) -> bool {
        self.mime_type.starts_with("video/")
    }
}

impl fmt::Display for DataUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "data:{};base64,{}", self.mime_type, self.data)
    }
}

impl FromStr for DataUri {
    type Err = PosterError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Reads a local image file into a data URI.
///
/// The format comes from the file's magic bytes; the extension is only
/// consulted when the bytes are not recognised.
pub fn load_image(path: impl AsRef<Path>) -> Result<DataUri> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    image_to_data_uri(&bytes, path.extension().and_then(|e| e.to_str()))
}

/// Turns uploaded bytes into a data URI, rejecting non-image content.
pub fn image_to_data_uri(bytes: &[u8], extension: Option<&str>) -> Result<DataUri> {
    if bytes.is_empty() {
        return Err(PosterError::InvalidRequest("uploaded file is empty".into()));
    }
    let format = ImageFormat::from_magic_bytes(bytes)
        .or_else(|| extension.and_then(ImageFormat::from_extension))
        .ok_or_else(|| {
            PosterError::InvalidRequest("uploaded file is not a PNG, JPEG or WebP image".into())
        })?;
    tracing::debug!(format = ?format, size = bytes.len(), "loaded upload");
    Ok(DataUri::from_bytes(bytes, format.mime_type()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: [u8; 12] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

    #[test]
    fn test_parse_round_trips_display() {
        let uri = DataUri::parse("data:image/png;base64,iVBORw0KGgo=").unwrap();
        assert_eq!(uri.mime_type, "image/png");
        assert_eq!(uri.data, "iVBORw0KGgo=");
        assert_eq!(uri.to_string(), "data:image/png;base64,iVBORw0KGgo=");
        assert!(uri.is_image());
        assert!(!uri.is_video());
    }

    #[test]
    fn test_parse_strips_whitespace() {
        let uri: DataUri = "data:image/jpeg;base64,/9j/\n4AAQ".parse().unwrap();
        assert_eq!(uri.data, "/9j/4AAQ");
    }

    #[test]
    fn test_parse_rejects_non_data_uri() {
        assert!(DataUri::parse("https://example.com/a.png").is_err());
        assert!(DataUri::parse("data:image/png,plain").is_err());
        assert!(DataUri::parse("data:;base64,AAAA").is_err());
    }

    #[test]
    fn test_decode_without_padding() {
        let uri = DataUri {
            mime_type: "image/png".into(),
            data: "aGVsbG8".into(),
        };
        assert_eq!(uri.decode().unwrap(), b"hello");
    }

    #[test]
    fn test_image_to_data_uri_detects_magic() {
        let uri = image_to_data_uri(&PNG_MAGIC, Some("jpg")).unwrap();
        assert_eq!(uri.mime_type, "image/png");
        assert_eq!(uri.decode().unwrap(), PNG_MAGIC);
    }

    #[test]
    fn test_image_to_data_uri_falls_back_to_extension() {
        let uri = image_to_data_uri(b"not-really-webp", Some("webp")).unwrap();
        assert_eq!(uri.mime_type, "image/webp");
    }

    #[test]
    fn test_image_to_data_uri_rejects_other_files() {
        let err = image_to_data_uri(b"%PDF-1.7 lots of bytes", Some("pdf")).unwrap_err();
        assert!(matches!(err, PosterError::InvalidRequest(_)));
        assert!(image_to_data_uri(&[], None).is_err());
    }

    #[test]
    fn test_load_image_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("product.png");
        std::fs::write(&path, PNG_MAGIC).unwrap();
        let uri = load_image(&path).unwrap();
        assert!(uri.to_string().starts_with("data:image/png;base64,"));
    }
}
