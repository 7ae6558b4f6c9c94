//! Payload request builder
//!
//! Turns a carrier, a secret payload, a password and the encryption toggle
//! into a route plus the multipart fields the backend expects. Pure: no I/O
//! happens here, so every field decision is testable without a server.
//!
//! Field rules:
//! - `carrier` (binary part) for audio/video/image; text routes send
//!   `host_text` (embed) or `watermarked_text` (extract) as plain strings
//! - `message` only when non-empty
//! - `secret_file` only on embed, never for audio or text carriers
//! - `password` always, even with encryption off
//! - `encrypt` always, as the literal `"true"` or `"false"`
//! - `ecc` on audio/video embed, `container` on video embed, both after
//!   `encrypt`
//! - part content types must parse as MIME types: an unparsable carrier
//!   media type is left off the part, an unparsable secret file content
//!   type is rejected

use crate::error::{StegoError, StegoResult};
use std::fmt;
use stegx_common::{CarrierFile, CarrierKind, SecretPayload};
use tracing::debug;

/// Container hint sent with video embeds when none is given
pub const DEFAULT_VIDEO_CONTAINER: &str = "mp4";

/// Filename given to the message part on binary routes
pub const MESSAGE_PART_FILENAME: &str = "message.txt";

const MESSAGE_PART_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Hiding vs. recovering a payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Embed,
    Extract,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Embed => "embed",
            Direction::Extract => "extract",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One of the eight backend routes
///
/// Only constructible for known carrier kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Route {
    kind: CarrierKind,
    direction: Direction,
}

impl Route {
    pub const AUDIO_EMBED: Route = Route::fixed(CarrierKind::Audio, Direction::Embed);
    pub const AUDIO_EXTRACT: Route = Route::fixed(CarrierKind::Audio, Direction::Extract);
    pub const VIDEO_EMBED: Route = Route::fixed(CarrierKind::Video, Direction::Embed);
    pub const VIDEO_EXTRACT: Route = Route::fixed(CarrierKind::Video, Direction::Extract);
    pub const IMAGE_EMBED: Route = Route::fixed(CarrierKind::Image, Direction::Embed);
    pub const IMAGE_EXTRACT: Route = Route::fixed(CarrierKind::Image, Direction::Extract);
    pub const TEXT_EMBED: Route = Route::fixed(CarrierKind::Text, Direction::Embed);
    pub const TEXT_EXTRACT: Route = Route::fixed(CarrierKind::Text, Direction::Extract);

    const fn fixed(kind: CarrierKind, direction: Direction) -> Self {
        Self { kind, direction }
    }

    /// Route for a carrier kind and direction; `None` for [`CarrierKind::Unknown`]
    pub fn new(kind: CarrierKind, direction: Direction) -> Option<Self> {
        match kind {
            CarrierKind::Unknown => None,
            _ => Some(Self { kind, direction }),
        }
    }

    /// All eight routes
    pub fn all() -> [Route; 8] {
        [
            Route::AUDIO_EMBED,
            Route::AUDIO_EXTRACT,
            Route::VIDEO_EMBED,
            Route::VIDEO_EXTRACT,
            Route::IMAGE_EMBED,
            Route::IMAGE_EXTRACT,
            Route::TEXT_EMBED,
            Route::TEXT_EXTRACT,
        ]
    }

    pub fn kind(&self) -> CarrierKind {
        self.kind
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Path relative to the configured endpoint
    pub fn path(&self) -> &'static str {
        match (self.kind, self.direction) {
            (CarrierKind::Audio, Direction::Embed) => "/api/audio/embed",
            (CarrierKind::Audio, Direction::Extract) => "/api/audio/extract",
            (CarrierKind::Video, Direction::Embed) => "/api/video/embed",
            (CarrierKind::Video, Direction::Extract) => "/api/video/extract",
            (CarrierKind::Image, Direction::Embed) => "/api/image/embed",
            (CarrierKind::Image, Direction::Extract) => "/api/image/extract",
            (CarrierKind::Text, Direction::Embed) => "/api/text/embed",
            (CarrierKind::Text, Direction::Extract) => "/api/text/extract",
            (CarrierKind::Unknown, _) => unreachable!("Route is never built for unknown carriers"),
        }
    }

    /// Human-readable action name used in error messages ("audio embed")
    pub fn action(&self) -> String {
        format!("{} {}", self.kind, self.direction)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Value of one multipart field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// Plain string field
    Text(String),
    /// Part with a filename (and optional content type)
    File {
        bytes: Vec<u8>,
        filename: String,
        content_type: Option<String>,
    },
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text),
            FieldValue::File { .. } => None,
        }
    }
}

/// Named multipart field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    pub name: &'static str,
    pub value: FieldValue,
}

/// A fully built request, ready for a backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StegoRequest {
    pub route: Route,
    pub fields: Vec<FormField>,
}

impl StegoRequest {
    fn new(route: Route) -> Self {
        Self {
            route,
            fields: Vec::new(),
        }
    }

    fn text(&mut self, name: &'static str, value: impl Into<String>) {
        self.fields.push(FormField {
            name,
            value: FieldValue::Text(value.into()),
        });
    }

    fn file(
        &mut self,
        name: &'static str,
        bytes: Vec<u8>,
        filename: impl Into<String>,
        content_type: Option<String>,
    ) {
        self.fields.push(FormField {
            name,
            value: FieldValue::File {
                bytes,
                filename: filename.into(),
                content_type,
            },
        });
    }

    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|f| f.name == name).map(|f| &f.value)
    }

    pub fn text_field(&self, name: &str) -> Option<&str> {
        self.field(name).and_then(FieldValue::as_text)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    pub fn field_names(&self) -> Vec<&'static str> {
        self.fields.iter().map(|f| f.name).collect()
    }
}

/// Opaque pass-through options for embed requests
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedOptions {
    /// Error-correction flag (audio and video)
    pub ecc: bool,
    /// Container format hint (video only); defaults to `mp4`
    pub container: Option<String>,
}

impl Default for EmbedOptions {
    fn default() -> Self {
        Self {
            ecc: true,
            container: None,
        }
    }
}

fn bool_field(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

/// Build the request for `direction` on `carrier`
///
/// Rejects, before anything is sent: unknown carriers, empty carriers, a
/// secret file on a carrier that cannot take one, an empty secret file or
/// one with an unparsable content type, and an embed with nothing to embed. Whether a password is present when
/// `encrypt` is set is the caller's check; `encrypt` and `password` are
/// transmitted as given.
pub fn build_request(
    direction: Direction,
    carrier: &CarrierFile,
    payload: &SecretPayload,
    password: &str,
    encrypt: bool,
    options: &EmbedOptions,
) -> StegoResult<StegoRequest> {
    let kind = carrier.kind();
    let route = Route::new(kind, direction).ok_or_else(|| {
        StegoError::precondition(format!(
            "Unsupported carrier type for {} ({})",
            if carrier.name().is_empty() { "<unnamed>" } else { carrier.name() },
            if carrier.media_type().is_empty() { "no media type" } else { carrier.media_type() },
        ))
    })?;

    let mut request = StegoRequest::new(route);

    match direction {
        Direction::Embed => attach_embed_fields(&mut request, carrier, payload)?,
        Direction::Extract => attach_carrier(&mut request, carrier, "watermarked_text")?,
    }

    request.text("password", password);
    request.text("encrypt", bool_field(encrypt));

    if direction == Direction::Embed {
        attach_embed_options(&mut request, options);
    }

    debug!(
        route = %request.route,
        fields = ?request.field_names(),
        "Built stego request"
    );
    Ok(request)
}

fn attach_carrier(
    request: &mut StegoRequest,
    carrier: &CarrierFile,
    text_field: &'static str,
) -> StegoResult<()> {
    match carrier.as_text() {
        Some(text) => {
            if text.trim().is_empty() {
                return Err(StegoError::precondition("Host text must not be empty"));
            }
            request.text(text_field, text);
        }
        None => {
            if carrier.is_empty() {
                return Err(StegoError::precondition("Carrier file is empty"));
            }
            let content_type = Some(carrier.media_type())
                .filter(|t| is_valid_content_type(t))
                .map(str::to_string);
            if content_type.is_none() && !carrier.media_type().is_empty() {
                debug!(
                    media_type = carrier.media_type(),
                    "Dropping unparsable carrier media type"
                );
            }
            request.file("carrier", carrier.bytes().to_vec(), carrier.name(), content_type);
        }
    }
    Ok(())
}

fn attach_embed_fields(
    request: &mut StegoRequest,
    carrier: &CarrierFile,
    payload: &SecretPayload,
) -> StegoResult<()> {
    let kind = request.route.kind();

    // Policy first, so an audio + file request fails the same way regardless
    // of what else is wrong with it
    if let Some(file) = payload.file() {
        if !kind.accepts_secret_file() {
            return Err(StegoError::precondition(format!(
                "{} carriers accept text messages only, not files ({})",
                kind, file.filename
            )));
        }
        if file.bytes.is_empty() {
            return Err(StegoError::precondition(format!(
                "Secret file is empty: {}",
                file.filename
            )));
        }
        if let Some(content_type) = &file.content_type {
            if !is_valid_content_type(content_type) {
                return Err(StegoError::precondition(format!(
                    "Invalid content type for {}: {}",
                    file.filename, content_type
                )));
            }
        }
    }
    if !payload.has_content() {
        return Err(StegoError::precondition(
            "Nothing to embed: provide a message or a secret file",
        ));
    }

    attach_carrier(request, carrier, "host_text")?;

    if let Some(message) = payload.message() {
        match kind {
            CarrierKind::Text => request.text("message", message),
            _ => request.file(
                "message",
                message.as_bytes().to_vec(),
                MESSAGE_PART_FILENAME,
                Some(MESSAGE_PART_CONTENT_TYPE.to_string()),
            ),
        }
    }

    if let Some(file) = payload.file() {
        request.file(
            "secret_file",
            file.bytes.clone(),
            file.filename.clone(),
            file.content_type.clone(),
        );
    }

    Ok(())
}

fn attach_embed_options(request: &mut StegoRequest, options: &EmbedOptions) {
    match request.route.kind() {
        CarrierKind::Audio => request.text("ecc", bool_field(options.ecc)),
        CarrierKind::Video => {
            request.text("ecc", bool_field(options.ecc));
            let container = options
                .container
                .as_deref()
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .unwrap_or(DEFAULT_VIDEO_CONTAINER);
            request.text("container", container);
        }
        CarrierKind::Image | CarrierKind::Text | CarrierKind::Unknown => {}
    }
}

/// Whether a part content type would be accepted on the wire
fn is_valid_content_type(content_type: &str) -> bool {
    content_type.parse::<mime::Mime>().is_ok()
}
