//! Image versions.
//!
//! An [`ImageRef`] is one stored version of the image being edited: the payload plus
//! the instruction (label) that produced it. The payload itself is opaque to the core;
//! we only carry its MIME type so backends and presentation layers can round-trip it.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use uuid::Uuid;

/// Label used for the version created by loading a file.
pub const ORIGINAL_LABEL: &str = "Original Upload";

/// Opaque unique identifier of an image version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageId(pub Uuid);

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
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for ImageId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(ImageId)
    }
}

/// Encoded image bytes plus their MIME type.
///
/// Bytes are shared, so cloning an `ImageContent` (and thus an `ImageRef`) never
/// copies the payload.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageContent {
    mime_type: String,
    bytes: Arc<[u8]>,
}

impl ImageContent {
    pub fn new(mime_type: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        let bytes: Vec<u8> = bytes.into();
        Self {
            mime_type: mime_type.into(),
            bytes: Arc::from(bytes),
        }
    }

    /// Decode a standard base64 payload.
    pub fn from_base64(mime_type: impl Into<String>, data: &str) -> Result<Self, ContentError> {
        let bytes = BASE64.decode(data.trim())?;
        Ok(Self::new(mime_type, bytes))
    }

    /// Parse a `data:<mime>;base64,<payload>` URL.
    ///
    /// Input without the `data:` scheme but with a comma is accepted too; everything
    /// up to the first comma is dropped and the MIME type defaults to `image/png`.
    pub fn from_data_url(url: &str) -> Result<Self, ContentError> {
        let url = url.trim();
        let Some((header, payload)) = url.split_once(',') else {
            return Err(ContentError::InvalidDataUrl {
                reason: "missing ',' separator".into(),
            });
        };

        let mime_type = match header.strip_prefix("data:") {
            Some(meta) => {
                let Some(mime) = meta.strip_suffix(";base64") else {
                    return Err(ContentError::InvalidDataUrl {
                        reason: "only base64 data URLs are supported".into(),
                    });
                };
                if mime.is_empty() {
                    "image/png"
                } else {
                    mime
                }
            }
            None => "image/png",
        };

        Self::from_base64(mime_type, payload)
    }

    pub fn to_base64(&self) -> String {
        BASE64.encode(&self.bytes)
    }

    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.to_base64())
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for ImageContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageContent")
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// One immutable version in the edit history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    id: ImageId,
    content: ImageContent,
    label: String,
    created_at_ms: i64,
}

impl ImageRef {
    /// Create a new version with a fresh id and timestamp.
    pub fn new(content: ImageContent, label: impl Into<String>) -> Self {
        let label = label.into();
        let id = ImageId::new();
        let created_at_ms = next_timestamp_ms();

        tracing::trace!(
            image_id = %id,
            label = %label,
            mime_type = content.mime_type(),
            bytes = content.len(),
            "created image version"
        );

        Self {
            id,
            content,
            label,
            created_at_ms,
        }
    }

    /// Version for a freshly loaded file.
    pub fn original(content: ImageContent) -> Self {
        Self::new(content, ORIGINAL_LABEL)
    }

    pub fn id(&self) -> ImageId {
        self.id
    }

    pub fn content(&self) -> &ImageContent {
        &self.content
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Milliseconds since the Unix epoch. Strictly increasing within a process.
    pub fn created_at_ms(&self) -> i64 {
        self.created_at_ms
    }
}

static LAST_TIMESTAMP_MS: AtomicI64 = AtomicI64::new(0);

// Wall clock, bumped by one whenever it has not advanced past the last stamp.
fn next_timestamp_ms() -> i64 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0);

    let mut prev = LAST_TIMESTAMP_MS.load(Ordering::Relaxed);
    loop {
        let next = now.max(prev + 1);
        match LAST_TIMESTAMP_MS.compare_exchange_weak(
            prev,
            next,
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => return next,
            Err(actual) => prev = actual,
        }
    }
}

/// Errors decoding image payloads.
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("invalid data URL: {reason}")]
    InvalidDataUrl { reason: String },

    #[error("invalid base64 payload: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_url_roundtrip_keeps_mime() {
        let content = ImageContent::new("image/jpeg", vec![0xff, 0xd8, 0xff, 0xe0]);
        let url = content.to_data_url();
        assert!(url.starts_with("data:image/jpeg;base64,"));

        let parsed = ImageContent::from_data_url(&url).unwrap();
        assert_eq!(parsed, content);
    }

    #[test]
    fn test_prefixless_payload_after_comma() {
        let parsed = ImageContent::from_data_url("whatever,AQID").unwrap();
        assert_eq!(parsed.as_bytes(), &[1, 2, 3]);
        assert_eq!(parsed.mime_type(), "image/png");
    }

    #[test]
    fn test_malformed_data_urls_rejected() {
        assert!(matches!(
            ImageContent::from_data_url("AQID"),
            Err(ContentError::InvalidDataUrl { .. })
        ));
        assert!(matches!(
            ImageContent::from_data_url("data:image/png,AQID"),
            Err(ContentError::InvalidDataUrl { .. })
        ));
        assert!(matches!(
            ImageContent::from_data_url("data:image/png;base64,!!!"),
            Err(ContentError::InvalidBase64(_))
        ));
    }

    #[test]
    fn test_clone_shares_bytes() {
        let content = ImageContent::new("image/png", vec![7u8; 1024]);
        let copy = content.clone();
        assert!(Arc::ptr_eq(&content.bytes, &copy.bytes));
    }

    #[test]
    fn test_image_refs_get_unique_ids_and_increasing_timestamps() {
        let content = ImageContent::new("image/png", vec![1]);
        let a = ImageRef::original(content.clone());
        let b = ImageRef::new(content, "add hat");

        assert_ne!(a.id(), b.id());
        assert!(b.created_at_ms() > a.created_at_ms());
        assert_eq!(a.label(), ORIGINAL_LABEL);
        assert_eq!(b.label(), "add hat");
    }

    #[test]
    fn test_image_id_parses_its_display_form() {
        let id = ImageId::new();
        let parsed: ImageId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
        assert!("not-a-uuid".parse::<ImageId>().is_err());
    }

    #[test]
    fn test_image_id_serializes_as_plain_string() {
        let id = ImageId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{id}\""));

        let back: ImageId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
