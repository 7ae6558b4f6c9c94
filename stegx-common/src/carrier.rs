//! Carrier classification
//!
//! Maps a carrier's declared media type and filename onto the carrier kind
//! that decides which backend route handles it. The declared media type wins
//! when it names a concrete family (`audio/`, `video/`, `image/`); generic or
//! missing types fall back to the filename extension.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Extensions recognized as audio carriers
pub const AUDIO_EXTENSIONS: &[&str] = &["wav", "mp3", "ogg", "flac", "aac", "m4a"];

/// Extensions recognized as video carriers
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "wmv", "flv", "webm", "mkv", "m4v"];

/// Extensions recognized as image carriers
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "gif"];

/// Kind of host a secret payload is hidden in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CarrierKind {
    Audio,
    Video,
    Image,
    Text,
    /// Neither the media type nor the extension matched; must be rejected
    /// before any request is built
    Unknown,
}

impl CarrierKind {
    /// Whether a secret *file* (as opposed to a text message) may be hidden
    /// in this kind of carrier
    ///
    /// Audio carriers accept text messages only. Text carriers have no file
    /// part in their route either.
    pub fn accepts_secret_file(&self) -> bool {
        match self {
            CarrierKind::Audio | CarrierKind::Text => false,
            CarrierKind::Video | CarrierKind::Image | CarrierKind::Unknown => true,
        }
    }

    /// Lowercase name used in route paths and log output
    pub fn as_str(&self) -> &'static str {
        match self {
            CarrierKind::Audio => "audio",
            CarrierKind::Video => "video",
            CarrierKind::Image => "image",
            CarrierKind::Text => "text",
            CarrierKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for CarrierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a binary carrier from its declared media type and filename
///
/// Text carriers are never produced here: host text is supplied as a string
/// (see [`CarrierFile::text`]), not as a file.
pub fn classify(media_type: &str, filename: &str) -> CarrierKind {
    let media_type = media_type.trim().to_ascii_lowercase();

    if media_type.starts_with("audio/") {
        return CarrierKind::Audio;
    }
    if media_type.starts_with("video/") {
        return CarrierKind::Video;
    }
    if media_type.starts_with("image/") {
        return CarrierKind::Image;
    }

    let extension = match filename.rsplit_once('.') {
        Some((_, ext)) => ext.to_ascii_lowercase(),
        None => return CarrierKind::Unknown,
    };

    if AUDIO_EXTENSIONS.contains(&extension.as_str()) {
        CarrierKind::Audio
    } else if VIDEO_EXTENSIONS.contains(&extension.as_str()) {
        CarrierKind::Video
    } else if IMAGE_EXTENSIONS.contains(&extension.as_str()) {
        CarrierKind::Image
    } else {
        CarrierKind::Unknown
    }
}

/// Where a carrier's content comes from
#[derive(Debug, Clone, PartialEq, Eq)]
enum CarrierSource {
    Binary {
        bytes: Vec<u8>,
        media_type: String,
        name: String,
    },
    Text(String),
}

/// Immutable carrier supplied by the caller
///
/// The kind is derived from the content on every call to [`CarrierFile::kind`]
/// and is never stored alongside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CarrierFile {
    source: CarrierSource,
}

impl CarrierFile {
    /// Binary carrier (audio, video or image file)
    pub fn new(bytes: Vec<u8>, media_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            source: CarrierSource::Binary {
                bytes,
                media_type: media_type.into(),
                name: name.into(),
            },
        }
    }

    /// Plain-text carrier (host text for embedding, watermarked text for extraction)
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            source: CarrierSource::Text(content.into()),
        }
    }

    pub fn kind(&self) -> CarrierKind {
        match &self.source {
            CarrierSource::Binary {
                media_type, name, ..
            } => classify(media_type, name),
            CarrierSource::Text(_) => CarrierKind::Text,
        }
    }

    /// Raw bytes of the carrier (UTF-8 bytes for text carriers)
    pub fn bytes(&self) -> &[u8] {
        match &self.source {
            CarrierSource::Binary { bytes, .. } => bytes,
            CarrierSource::Text(text) => text.as_bytes(),
        }
    }

    /// Host text, if this is a text carrier
    pub fn as_text(&self) -> Option<&str> {
        match &self.source {
            CarrierSource::Text(text) => Some(text),
            CarrierSource::Binary { .. } => None,
        }
    }

    pub fn media_type(&self) -> &str {
        match &self.source {
            CarrierSource::Binary { media_type, .. } => media_type,
            CarrierSource::Text(_) => "text/plain",
        }
    }

    pub fn name(&self) -> &str {
        match &self.source {
            CarrierSource::Binary { name, .. } => name,
            CarrierSource::Text(_) => "carrier.txt",
        }
    }

    pub fn len(&self) -> usize {
        self.bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes().is_empty()
    }
}
