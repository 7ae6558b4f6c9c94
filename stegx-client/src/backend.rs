//! Backend abstraction and HTTP implementation
//!
//! The embedding algorithm runs remotely. [`StegoBackend`] is the seam: one
//! method per (carrier kind, direction) pair, each taking a built
//! [`StegoRequest`] and returning the raw [`BackendResponse`]. Status and body
//! interpretation stay in [`crate::response`], so mocks only have to produce
//! bytes.

use crate::error::{StegoError, StegoResult};
use crate::request::{Direction, FieldValue, Route, StegoRequest};
use crate::response::BackendResponse;
use async_trait::async_trait;
use reqwest::header::{HeaderName, CONTENT_DISPOSITION, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use std::time::Duration;
use stegx_common::config::ClientConfig;
use stegx_common::CarrierKind;
use tracing::{debug, info};

/// Remote stego service
///
/// Implementations report transport failures as
/// [`StegoError::TransportUnreachable`] and return every HTTP response,
/// success or not, as a [`BackendResponse`].
#[async_trait]
pub trait StegoBackend: Send + Sync {
    /// Where requests go (used in error messages)
    fn endpoint(&self) -> &str;

    async fn embed_audio(&self, request: StegoRequest) -> StegoResult<BackendResponse>;
    async fn extract_audio(&self, request: StegoRequest) -> StegoResult<BackendResponse>;
    async fn embed_video(&self, request: StegoRequest) -> StegoResult<BackendResponse>;
    async fn extract_video(&self, request: StegoRequest) -> StegoResult<BackendResponse>;
    async fn embed_image(&self, request: StegoRequest) -> StegoResult<BackendResponse>;
    async fn extract_image(&self, request: StegoRequest) -> StegoResult<BackendResponse>;
    async fn embed_text(&self, request: StegoRequest) -> StegoResult<BackendResponse>;
    async fn extract_text(&self, request: StegoRequest) -> StegoResult<BackendResponse>;

    /// Route a request to the method matching its route
    async fn dispatch(&self, request: StegoRequest) -> StegoResult<BackendResponse> {
        match (request.route.kind(), request.route.direction()) {
            (CarrierKind::Audio, Direction::Embed) => self.embed_audio(request).await,
            (CarrierKind::Audio, Direction::Extract) => self.extract_audio(request).await,
            (CarrierKind::Video, Direction::Embed) => self.embed_video(request).await,
            (CarrierKind::Video, Direction::Extract) => self.extract_video(request).await,
            (CarrierKind::Image, Direction::Embed) => self.embed_image(request).await,
            (CarrierKind::Image, Direction::Extract) => self.extract_image(request).await,
            (CarrierKind::Text, Direction::Embed) => self.embed_text(request).await,
            (CarrierKind::Text, Direction::Extract) => self.extract_text(request).await,
            (CarrierKind::Unknown, _) => Err(StegoError::precondition(
                "No backend route for unknown carriers",
            )),
        }
    }
}

/// [`StegoBackend`] over HTTP(S) multipart POSTs
#[derive(Debug, Clone)]
pub struct HttpBackend {
    http_client: reqwest::Client,
    endpoint: String,
}

impl HttpBackend {
    pub fn new(config: &ClientConfig) -> StegoResult<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                stegx_common::Error::Config(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            http_client,
            endpoint: config.endpoint.clone(),
        })
    }

    /// Full URL for a route
    pub fn url(&self, route: Route) -> String {
        format!("{}{}", self.endpoint, route.path())
    }

    fn form(request: StegoRequest) -> StegoResult<Form> {
        let mut form = Form::new();
        for field in request.fields {
            form = match field.value {
                FieldValue::Text(text) => form.text(field.name, text),
                FieldValue::File {
                    bytes,
                    filename,
                    content_type,
                } => {
                    let part = Part::bytes(bytes).file_name(filename);
                    let part = match content_type {
                        Some(content_type) => part.mime_str(&content_type).map_err(|e| {
                            StegoError::precondition(format!(
                                "Invalid content type for {}: {} ({})",
                                field.name, content_type, e
                            ))
                        })?,
                        None => part,
                    };
                    form.part(field.name, part)
                }
            };
        }
        Ok(form)
    }

    fn unreachable(&self, route: Route, err: reqwest::Error) -> StegoError {
        StegoError::TransportUnreachable {
            endpoint: self.endpoint.clone(),
            action: route.action(),
            reason: err.to_string(),
        }
    }

    async fn post(&self, request: StegoRequest) -> StegoResult<BackendResponse> {
        let route = request.route;
        let url = self.url(route);
        let form = Self::form(request)?;

        debug!(url = %url, "POST stego request");

        let response = self
            .http_client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.unreachable(route, e))?;

        let status = response.status().as_u16();
        let header = |name: HeaderName| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let content_type = header(CONTENT_TYPE);
        let content_disposition = header(CONTENT_DISPOSITION);

        let body = response
            .bytes()
            .await
            .map_err(|e| self.unreachable(route, e))?
            .to_vec();

        info!(
            route = %route,
            status,
            bytes = body.len(),
            "Stego service responded"
        );

        Ok(BackendResponse {
            status,
            content_type,
            content_disposition,
            body,
        })
    }
}

#[async_trait]
impl StegoBackend for HttpBackend {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn embed_audio(&self, request: StegoRequest) -> StegoResult<BackendResponse> {
        self.post(request).await
    }

    async fn extract_audio(&self, request: StegoRequest) -> StegoResult<BackendResponse> {
        self.post(request).await
    }

    async fn embed_video(&self, request: StegoRequest) -> StegoResult<BackendResponse> {
        self.post(request).await
    }

    async fn extract_video(&self, request: StegoRequest) -> StegoResult<BackendResponse> {
        self.post(request).await
    }

    async fn embed_image(&self, request: StegoRequest) -> StegoResult<BackendResponse> {
        self.post(request).await
    }

    async fn extract_image(&self, request: StegoRequest) -> StegoResult<BackendResponse> {
        self.post(request).await
    }

    async fn embed_text(&self, request: StegoRequest) -> StegoResult<BackendResponse> {
        self.post(request).await
    }

    async fn extract_text(&self, request: StegoRequest) -> StegoResult<BackendResponse> {
        self.post(request).await
    }
}
