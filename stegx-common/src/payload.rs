//! Secret payload data model
//!
//! What gets hidden ([`SecretPayload`]) and what comes back out
//! ([`DecodeResult`]).

use serde::{Deserialize, Serialize};

/// Filename used when the backend recovers a file without naming it
pub const DEFAULT_SECRET_FILENAME: &str = "secret.bin";

/// A file to hide inside a carrier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretFile {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub content_type: Option<String>,
}

impl SecretFile {
    pub fn new(bytes: Vec<u8>, filename: impl Into<String>) -> Self {
        Self {
            bytes,
            filename: filename.into(),
            content_type: None,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// Secret content for an embed operation
///
/// `None` is a precondition violation for embedding. A message and a file may
/// travel together; the backend decides how to combine them.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SecretPayload {
    #[default]
    None,
    Message(String),
    File(SecretFile),
    MessageAndFile { message: String, file: SecretFile },
}

impl SecretPayload {
    /// Build a payload from optional parts, collapsing empty messages away
    pub fn from_parts(message: Option<String>, file: Option<SecretFile>) -> Self {
        let message = message.filter(|m| !m.is_empty());
        match (message, file) {
            (None, None) => SecretPayload::None,
            (Some(message), None) => SecretPayload::Message(message),
            (None, Some(file)) => SecretPayload::File(file),
            (Some(message), Some(file)) => SecretPayload::MessageAndFile { message, file },
        }
    }

    /// Message text, only when non-empty
    pub fn message(&self) -> Option<&str> {
        match self {
            SecretPayload::Message(message) | SecretPayload::MessageAndFile { message, .. } => {
                Some(message.as_str()).filter(|m| !m.is_empty())
            }
            SecretPayload::None | SecretPayload::File(_) => None,
        }
    }

    pub fn file(&self) -> Option<&SecretFile> {
        match self {
            SecretPayload::File(file) | SecretPayload::MessageAndFile { file, .. } => Some(file),
            SecretPayload::None | SecretPayload::Message(_) => None,
        }
    }

    /// True when there is something worth embedding (a non-empty message or a file)
    pub fn has_content(&self) -> bool {
        self.message().is_some() || self.file().is_some()
    }
}

/// A file recovered from a carrier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveredFile {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub content_type: Option<String>,
}

/// Outcome of an extract operation
///
/// Both fields absent means the carrier held nothing: a successful, empty
/// result rather than an error.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DecodeResult {
    pub message: Option<String>,
    pub file: Option<RecoveredFile>,
}

impl DecodeResult {
    pub fn is_empty(&self) -> bool {
        self.message.is_none() && self.file.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_parts_drops_empty_message() {
        assert_eq!(SecretPayload::from_parts(Some(String::new()), None), SecretPayload::None);
        assert_eq!(
            SecretPayload::from_parts(Some("hi".to_string()), None),
            SecretPayload::Message("hi".to_string())
        );

        let file = SecretFile::new(vec![1], "a.bin");
        assert_eq!(
            SecretPayload::from_parts(Some(String::new()), Some(file.clone())),
            SecretPayload::File(file)
        );
    }

    #[test]
    fn test_message_and_file_accessors() {
        let file = SecretFile::new(vec![9, 9], "doc.pdf").with_content_type("application/pdf");
        let payload = SecretPayload::MessageAndFile {
            message: "note".to_string(),
            file: file.clone(),
        };
        assert_eq!(payload.message(), Some("note"));
        assert_eq!(payload.file(), Some(&file));
        assert!(payload.has_content());
    }

    #[test]
    fn test_empty_message_variant_has_no_content() {
        let payload = SecretPayload::Message(String::new());
        assert_eq!(payload.message(), None);
        assert!(!payload.has_content());
        assert!(!SecretPayload::None.has_content());
    }

    #[test]
    fn test_decode_result_empty() {
        assert!(DecodeResult::default().is_empty());
        let result = DecodeResult {
            message: Some("x".to_string()),
            file: None,
        };
        assert!(!result.is_empty());
    }
}
