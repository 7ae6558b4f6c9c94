//! Demonstration self-test
//!
//! Synthesizes a sine-tone WAV carrier, embeds a message in it, extracts from
//! the returned carrier with the same key settings, and compares. Exercises
//! the WAV encoder, both audio routes and the response parser against a live
//! (or mock) backend in one call.

use crate::backend::StegoBackend;
use crate::error::{StegoError, StegoResult};
use crate::orchestrator::{DecodeRequest, EncodeRequest, Orchestrator};
use crate::response::EmbedResult;
use stegx_common::wav::{encode_wav, sine_wave};
use stegx_common::{CarrierFile, ProgressReporter, SecretPayload};
use tracing::info;
use uuid::Uuid;

const SELF_TEST_CARRIER_NAME: &str = "selftest.wav";

/// Self-test parameters
#[derive(Debug, Clone, PartialEq)]
pub struct SelfTestConfig {
    /// Message to round-trip
    pub message: String,
    /// Password; empty disables encryption
    pub password: String,
    pub frequency_hz: f32,
    pub duration_secs: f32,
    pub sample_rate: u32,
    pub amplitude: f32,
}

impl Default for SelfTestConfig {
    fn default() -> Self {
        Self {
            message: "hello".to_string(),
            password: String::new(),
            frequency_hz: 440.0,
            duration_secs: 1.0,
            sample_rate: 44100,
            amplitude: 0.5,
        }
    }
}

/// What the self-test observed
#[derive(Debug, Clone, PartialEq)]
pub struct SelfTestReport {
    pub embed_operation: Uuid,
    pub extract_operation: Uuid,
    pub carrier_bytes: usize,
    pub stego_bytes: usize,
    pub expected: String,
    pub recovered: Option<String>,
    pub passed: bool,
}

/// Run synthesize → embed → extract → compare
///
/// Embed progress fills [0, 0.5] of `progress`, extract fills [0.5, 1.0].
/// Operation failures are returned as errors; a successful round trip that
/// recovers the wrong message is a report with `passed == false`.
pub async fn run_self_test<B: StegoBackend>(
    orchestrator: &Orchestrator<B>,
    config: &SelfTestConfig,
    progress: &ProgressReporter,
) -> StegoResult<SelfTestReport> {
    let encrypt = !config.password.is_empty();

    let tone = sine_wave(
        config.frequency_hz,
        config.duration_secs,
        config.sample_rate,
        config.amplitude,
    );
    let wav = encode_wav(&[tone], config.sample_rate);
    let carrier_bytes = wav.len();

    info!(
        carrier_bytes,
        frequency_hz = config.frequency_hz,
        encrypt,
        "Self-test: synthesized carrier"
    );

    let embed = orchestrator
        .embed(
            EncodeRequest::new(
                CarrierFile::new(wav.into_bytes(), "audio/wav", SELF_TEST_CARRIER_NAME),
                SecretPayload::Message(config.message.clone()),
            )
            .with_password(config.password.clone())
            .with_encryption(encrypt),
            &progress.scaled(0.0, 0.5),
        )
        .await;
    let embed_operation = embed.operation.id();

    let stego = match embed.into_result()? {
        EmbedResult::Carrier(carrier) => carrier,
        EmbedResult::Watermarked(_) => {
            return Err(StegoError::malformed(
                "audio embed",
                "expected a binary carrier, got watermarked text",
            ))
        }
    };
    let stego_bytes = stego.bytes.len();

    let extract = orchestrator
        .extract(
            DecodeRequest::new(CarrierFile::new(stego.bytes, "audio/wav", stego.filename))
                .with_password(config.password.clone())
                .with_encryption(encrypt),
            &progress.scaled(0.5, 1.0),
        )
        .await;
    let extract_operation = extract.operation.id();
    let decoded = extract.into_result()?;

    let passed = decoded.message.as_deref() == Some(config.message.as_str());
    info!(passed, stego_bytes, "Self-test: round trip finished");

    Ok(SelfTestReport {
        embed_operation,
        extract_operation,
        carrier_bytes,
        stego_bytes,
        expected: config.message.clone(),
        recovered: decoded.message,
        passed,
    })
}
