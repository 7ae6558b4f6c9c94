//! # stegx Common Library
//!
//! Shared code for the stegx client:
//! - Carrier classification and the carrier-kind policy rules
//! - Secret payload / decode result data model
//! - WAV container synthesis
//! - Progress reporting contract
//! - Configuration loading

pub mod carrier;
pub mod config;
pub mod error;
pub mod payload;
pub mod progress;
pub mod wav;

pub use carrier::{classify, CarrierFile, CarrierKind};
pub use error::{Error, Result};
pub use payload::{DecodeResult, RecoveredFile, SecretFile, SecretPayload};
pub use progress::ProgressReporter;
pub use wav::{encode_wav, WavContainer};
