//! Response parser
//!
//! Normalizes what the backend sends back:
//! - binary embed routes return the stego carrier verbatim
//! - text embed returns `{ "watermarked": string }`
//! - extract routes return `{ message?, file?: { data, filename?, content_type? } }`
//!
//! Non-success statuses become [`StegoError::BackendError`]; success bodies of
//! the wrong shape become [`StegoError::MalformedResponse`].

use crate::error::{StegoError, StegoResult};
use crate::request::Route;
use base64::Engine;
use serde::Deserialize;
use stegx_common::payload::DEFAULT_SECRET_FILENAME;
use stegx_common::{CarrierKind, DecodeResult, RecoveredFile};
use tracing::{debug, warn};

/// Raw HTTP response as seen by the parser
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub content_disposition: Option<String>,
    pub body: Vec<u8>,
}

impl BackendResponse {
    /// 200 response with a body and no headers
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            content_type: None,
            content_disposition: None,
            body: body.into(),
        }
    }

    /// 200 response carrying a JSON document
    pub fn json(value: &serde_json::Value) -> Self {
        Self {
            content_type: Some("application/json".to_string()),
            ..Self::ok(value.to_string())
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_content_disposition(mut self, disposition: impl Into<String>) -> Self {
        self.content_disposition = Some(disposition.into());
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body as text (lossy)
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Stego carrier produced by a binary embed route
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StegoCarrier {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
    /// Suggested filename (server-provided or derived from the content type)
    pub filename: String,
}

/// Outcome of an embed operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmbedResult {
    /// Audio, video or image carrier with the payload hidden inside
    Carrier(StegoCarrier),
    /// Host text with the watermark applied
    Watermarked(String),
}

impl EmbedResult {
    /// Bytes to persist or feed back into an extract call
    pub fn bytes(&self) -> &[u8] {
        match self {
            EmbedResult::Carrier(carrier) => &carrier.bytes,
            EmbedResult::Watermarked(text) => text.as_bytes(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct WatermarkEnvelope {
    watermarked: String,
}

#[derive(Debug, Deserialize)]
struct DecodeEnvelope {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    file: Option<FileEnvelope>,
}

#[derive(Debug, Deserialize)]
struct FileEnvelope {
    data: String,
    #[serde(default)]
    filename: Option<String>,
    #[serde(default)]
    content_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    detail: String,
}

/// Turn a non-success status into a [`StegoError::BackendError`]
///
/// The message is the backend's `detail` string when the body is its JSON
/// error envelope, the body text verbatim otherwise, or a generic
/// "backend returned status N for <action>" when the body is empty.
pub fn check_status(route: Route, response: &BackendResponse) -> StegoResult<()> {
    if response.is_success() {
        return Ok(());
    }

    let action = route.action();
    let body = response.text();
    let message = if body.trim().is_empty() {
        format!("backend returned status {} for {}", response.status, action)
    } else {
        match serde_json::from_str::<ErrorEnvelope>(&body) {
            Ok(envelope) => envelope.detail,
            Err(_) => body,
        }
    };

    warn!(route = %route, status = response.status, "Backend error: {}", message);
    Err(StegoError::BackendError {
        action,
        status: response.status,
        message,
    })
}

/// Parse the response to an embed request
pub fn parse_embed_response(route: Route, response: BackendResponse) -> StegoResult<EmbedResult> {
    check_status(route, &response)?;
    let action = route.action();

    if route.kind() == CarrierKind::Text {
        let envelope: WatermarkEnvelope = serde_json::from_slice(&response.body)
            .map_err(|e| StegoError::malformed(&action, e))?;
        return Ok(EmbedResult::Watermarked(envelope.watermarked));
    }

    if response.body.is_empty() {
        return Err(StegoError::malformed(action, "empty carrier body"));
    }

    let filename = response
        .content_disposition
        .as_deref()
        .and_then(disposition_filename)
        .unwrap_or_else(|| {
            format!(
                "stego.{}",
                default_extension(route.kind(), response.content_type.as_deref())
            )
        });

    debug!(
        route = %route,
        bytes = response.body.len(),
        filename = %filename,
        "Received stego carrier"
    );

    Ok(EmbedResult::Carrier(StegoCarrier {
        bytes: response.body,
        content_type: response.content_type,
        filename,
    }))
}

/// Parse the response to an extract request (status check + envelope)
pub fn parse_extract_response(route: Route, response: BackendResponse) -> StegoResult<DecodeResult> {
    check_status(route, &response)?;
    parse_decode_response(route, &response.body)
}

/// Parse a decode envelope
///
/// `message` and `file` are independent: either, both or neither may be
/// present. Neither is a successful "nothing found" result.
pub fn parse_decode_response(route: Route, body: &[u8]) -> StegoResult<DecodeResult> {
    let action = route.action();

    let envelope: DecodeEnvelope =
        serde_json::from_slice(body).map_err(|e| StegoError::malformed(&action, e))?;

    let file = match envelope.file {
        Some(file) => {
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(file.data.trim())
                .map_err(|e| StegoError::malformed(&action, format!("invalid base64 file data: {}", e)))?;
            Some(RecoveredFile {
                bytes,
                filename: file
                    .filename
                    .filter(|f| !f.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_SECRET_FILENAME.to_string()),
                content_type: file.content_type,
            })
        }
        None => None,
    };

    let result = DecodeResult {
        message: envelope.message,
        file,
    };

    debug!(
        route = %route,
        has_message = result.message.is_some(),
        has_file = result.file.is_some(),
        "Parsed decode envelope"
    );
    Ok(result)
}

/// Extract the filename from a `Content-Disposition` header value
///
/// Only the final path component is kept so a hostile server cannot steer
/// where the file is written.
pub fn disposition_filename(disposition: &str) -> Option<String> {
    disposition
        .split(';')
        .map(str::trim)
        .find_map(|part| {
            let (key, value) = part.split_once('=')?;
            if key.trim().eq_ignore_ascii_case("filename") {
                Some(value.trim().trim_matches('"'))
            } else {
                None
            }
        })
        .and_then(|name| name.rsplit(|c| c == '/' || c == '\\').next())
        .map(str::trim)
        .filter(|name| !name.is_empty() && *name != "." && *name != "..")
        .map(str::to_string)
}

/// File extension for a stego carrier, from its content type or the route
pub fn default_extension(kind: CarrierKind, content_type: Option<&str>) -> &'static str {
    let essence = content_type
        .and_then(|t| t.split(';').next())
        .map(|t| t.trim().to_ascii_lowercase());

    match essence.as_deref() {
        Some("audio/wav") | Some("audio/x-wav") | Some("audio/wave") => "wav",
        Some("video/mp4") => "mp4",
        Some("video/x-matroska") => "mkv",
        Some("video/quicktime") => "mov",
        Some("video/x-msvideo") => "avi",
        Some("image/png") => "png",
        _ => match kind {
            CarrierKind::Audio => "wav",
            CarrierKind::Video => "mp4",
            CarrierKind::Image => "png",
            CarrierKind::Text => "txt",
            CarrierKind::Unknown => "bin",
        },
    }
}
