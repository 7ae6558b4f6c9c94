//! stegx-client library interface
//!
//! Client-side transport for the remote stego service:
//! - [`request`] builds route + multipart fields from carrier and payload
//! - [`backend`] sends them ([`backend::StegoBackend`] trait, HTTP implementation)
//! - [`response`] turns raw responses into uniform results
//! - [`orchestrator`] sequences one operation and tracks its state
//! - [`selftest`] runs the synthesized-WAV round trip

pub mod backend;
pub mod error;
pub mod orchestrator;
pub mod request;
pub mod response;
pub mod selftest;

pub use crate::backend::{HttpBackend, StegoBackend};
pub use crate::error::{StegoError, StegoResult};
pub use crate::orchestrator::{
    DecodeRequest, EncodeRequest, Operation, OperationReport, OperationState, Orchestrator,
};
pub use crate::request::{build_request, Direction, EmbedOptions, Route, StegoRequest};
pub use crate::response::{BackendResponse, EmbedResult, StegoCarrier};
