//! Core types for ModScan

use crate::error::{Error, Result};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Declared kind of a submitted item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Image,
    Text,
}

/// Payload carried by an item, exactly as submitted
#[derive(Debug, Clone)]
pub enum Payload {
    /// Raw image bytes
    Image(Arc<[u8]>),

    /// Base64 image body, decoded lazily so a bad encoding only fails its own item
    EncodedImage(String),

    /// Plain text
    Text(String),
}

/// One unit of input. Immutable once submitted.
#[derive(Debug, Clone)]
pub struct Item {
    payload: Payload,
}

impl Item {
    /// Create an image item from raw bytes
    pub fn image(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            payload: Payload::Image(Arc::from(bytes.into())),
        }
    }

    /// Create a text item
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            payload: Payload::Text(text.into()),
        }
    }

    /// Create an image item from a `data:image/...;base64,` URL.
    ///
    /// The header is stripped here; decoding happens when the item is
    /// classified.
    pub fn from_data_url(url: &str) -> Self {
        let body = match url.split_once(',') {
            Some((_, body)) => body,
            None => url,
        };
        Self {
            payload: Payload::EncodedImage(body.trim().to_string()),
        }
    }

    /// The declared kind of this item
    pub fn kind(&self) -> ItemKind {
        match self.payload {
            Payload::Image(_) | Payload::EncodedImage(_) => ItemKind::Image,
            Payload::Text(_) => ItemKind::Text,
        }
    }

    /// The submitted payload
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Text content, if this is a text item
    pub fn as_text(&self) -> Option<&str> {
        match &self.payload {
            Payload::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Decode and validate the image payload of the item at `index`.
    ///
    /// Fails with `MalformedInput` when the payload is not a decodable image
    /// or the item is a text item.
    pub fn decode_image(&self, index: usize) -> Result<Image> {
        let bytes: Arc<[u8]> = match &self.payload {
            Payload::Image(bytes) => Arc::clone(bytes),
            Payload::EncodedImage(body) => base64::engine::general_purpose::STANDARD
                .decode(body)
                .map(Arc::from)
                .map_err(|e| Error::malformed(index, format!("invalid base64 image: {}", e)))?,
            Payload::Text(_) => return Err(Error::malformed(index, "text item has no image")),
        };

        let format = ImageFormat::sniff(&bytes)
            .ok_or_else(|| Error::malformed(index, "unrecognized image format"))?;

        Ok(Image { bytes, format })
    }
}

/// Image container formats accepted by the image adapters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Jpeg,
    Png,
    Gif,
    Webp,
    Bmp,
}

impl ImageFormat {
    /// Identify the format from the leading magic bytes
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(Self::Jpeg)
        } else if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
            Some(Self::Png)
        } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
            Some(Self::Gif)
        } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
            Some(Self::Webp)
        } else if bytes.starts_with(b"BM") {
            Some(Self::Bmp)
        } else {
            None
        }
    }
}

/// A decoded, format-checked image handed to image adapters
#[derive(Debug, Clone)]
pub struct Image {
    bytes: Arc<[u8]>,
    format: ImageFormat,
}

impl Image {
    /// Encoded image bytes
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Detected container format
    pub fn format(&self) -> ImageFormat {
        self.format
    }
}

/// Names of the classifiers a batch may request
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ModelName {
    Clothing,
    AgeGender,
    Text,
    Profanity,
    Gesture,
}

impl ModelName {
    /// Every known model, in canonical order
    pub const ALL: [ModelName; 5] = [
        ModelName::Clothing,
        ModelName::AgeGender,
        ModelName::Text,
        ModelName::Profanity,
        ModelName::Gesture,
    ];

    /// Canonical lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Clothing => "clothing",
            Self::AgeGender => "age_gender",
            Self::Text => "text",
            Self::Profanity => "profanity",
            Self::Gesture => "gesture",
        }
    }

    /// Whether this model can run against an item of `kind`.
    ///
    /// Text and profanity apply to both kinds: on images they work on the
    /// text extracted by OCR.
    pub fn accepts(&self, kind: ItemKind) -> bool {
        match self {
            Self::Clothing | Self::AgeGender | Self::Gesture => kind == ItemKind::Image,
            Self::Text | Self::Profanity => true,
        }
    }
}

impl fmt::Display for ModelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        ModelName::ALL
            .into_iter()
            .find(|m| m.as_str() == normalized)
            .ok_or_else(|| Error::selection(format!("unknown model '{}'", s.trim())))
    }
}

/// Set of classifiers requested for a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSelection {
    models: BTreeSet<ModelName>,
}

impl ModelSelection {
    /// Parse a custom selection from model names.
    ///
    /// Unknown names and empty selections are rejected.
    pub fn parse<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        let models = names
            .iter()
            .map(|n| n.as_ref().parse::<ModelName>())
            .collect::<Result<BTreeSet<_>>>()?;

        if models.is_empty() {
            return Err(Error::selection("no models selected"));
        }

        Ok(Self { models })
    }

    /// Selection used by automated scans: every model
    pub fn all() -> Self {
        Self {
            models: ModelName::ALL.into_iter().collect(),
        }
    }

    /// Build a selection from already-typed model names
    pub fn of(models: impl IntoIterator<Item = ModelName>) -> Result<Self> {
        let models: BTreeSet<_> = models.into_iter().collect();
        if models.is_empty() {
            return Err(Error::selection("no models selected"));
        }
        Ok(Self { models })
    }

    /// Whether `model` was requested
    pub fn contains(&self, model: ModelName) -> bool {
        self.models.contains(&model)
    }

    /// Requested models in canonical order
    pub fn iter(&self) -> impl Iterator<Item = ModelName> + '_ {
        self.models.iter().copied()
    }

    /// Number of requested models
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// Always false for a validated selection
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

/// Closed set of moderation violation categories
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    FlaggedText,
    FlaggedClothing,
    FlaggedGesture,
    FlaggedAge,
}

impl ReasonCode {
    /// Every reason code
    pub const ALL: [ReasonCode; 4] = [
        ReasonCode::FlaggedText,
        ReasonCode::FlaggedClothing,
        ReasonCode::FlaggedGesture,
        ReasonCode::FlaggedAge,
    ];

    /// Counter key for this reason
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FlaggedText => "flagged_text",
            Self::FlaggedClothing => "flagged_clothing",
            Self::FlaggedGesture => "flagged_gesture",
            Self::FlaggedAge => "flagged_age",
        }
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Gender reported by the face detector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    #[serde(rename = "male")]
    Male,
    #[serde(rename = "female")]
    Female,
    /// No face detected
    #[serde(rename = "N/A")]
    Unknown,
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Male => "male",
            Self::Female => "female",
            Self::Unknown => "N/A",
        })
    }
}
