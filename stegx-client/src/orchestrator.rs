//! Operation orchestrator
//!
//! Sequences one operation end to end:
//! classify → precondition checks → build request → backend call → parse.
//!
//! Each operation walks the state machine
//!
//! ```text
//! Idle ──dispatch──▶ InFlight ──succeed──▶ Succeeded
//!   │                   │
//!   └───────fail────────┴──────fail──────▶ Failed
//! ```
//!
//! Precondition failures go straight from Idle to Failed, so no request is
//! ever sent for them. Terminal states accept no further transitions; a new
//! call always starts a new operation. Nothing is retried.

use crate::backend::StegoBackend;
use crate::error::{StegoError, StegoResult};
use crate::request::{build_request, Direction, EmbedOptions, Route};
use crate::response::{parse_embed_response, parse_extract_response, BackendResponse, EmbedResult};
use stegx_common::progress::{CHECKPOINT_DISPATCHED, CHECKPOINT_STARTED};
use stegx_common::{CarrierFile, CarrierKind, DecodeResult, ProgressReporter, SecretPayload};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Lifecycle state of a single operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationState {
    Idle,
    InFlight,
    Succeeded,
    Failed,
}

impl OperationState {
    /// Idle → InFlight
    pub fn dispatch(self) -> Option<Self> {
        match self {
            OperationState::Idle => Some(OperationState::InFlight),
            _ => None,
        }
    }

    /// InFlight → Succeeded
    pub fn succeed(self) -> Option<Self> {
        match self {
            OperationState::InFlight => Some(OperationState::Succeeded),
            _ => None,
        }
    }

    /// Idle | InFlight → Failed
    pub fn fail(self) -> Option<Self> {
        match self {
            OperationState::Idle | OperationState::InFlight => Some(OperationState::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, OperationState::Succeeded | OperationState::Failed)
    }
}

/// Record of one embed or extract operation
#[derive(Debug, Clone)]
pub struct Operation {
    id: Uuid,
    direction: Direction,
    kind: CarrierKind,
    state: OperationState,
    history: Vec<OperationState>,
}

impl Operation {
    fn new(direction: Direction, kind: CarrierKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            direction,
            kind,
            state: OperationState::Idle,
            history: vec![OperationState::Idle],
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn kind(&self) -> CarrierKind {
        self.kind
    }

    pub fn state(&self) -> OperationState {
        self.state
    }

    /// Every state visited, starting with Idle
    pub fn history(&self) -> &[OperationState] {
        &self.history
    }

    /// Whether a request was handed to the backend
    pub fn reached_network(&self) -> bool {
        self.history.contains(&OperationState::InFlight)
    }

    fn transition(&mut self, step: fn(OperationState) -> Option<OperationState>) -> bool {
        match step(self.state) {
            Some(next) => {
                debug!(operation_id = %self.id, from = ?self.state, to = ?next, "Operation transition");
                self.state = next;
                self.history.push(next);
                true
            }
            None => {
                warn!(operation_id = %self.id, state = ?self.state, "Rejected operation transition");
                false
            }
        }
    }
}

/// Finished operation with its outcome
#[derive(Debug)]
pub struct OperationReport<T> {
    pub operation: Operation,
    pub outcome: StegoResult<T>,
}

impl<T> OperationReport<T> {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn into_result(self) -> StegoResult<T> {
        self.outcome
    }
}

/// Inputs for an embed operation
#[derive(Debug, Clone)]
pub struct EncodeRequest {
    pub carrier: CarrierFile,
    pub payload: SecretPayload,
    pub password: String,
    pub encrypt: bool,
    pub options: EmbedOptions,
}

impl EncodeRequest {
    /// Encrypted embed with an empty password; set one with [`Self::with_password`]
    /// or turn encryption off with [`Self::with_encryption`]
    pub fn new(carrier: CarrierFile, payload: SecretPayload) -> Self {
        Self {
            carrier,
            payload,
            password: String::new(),
            encrypt: true,
            options: EmbedOptions::default(),
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    pub fn with_encryption(mut self, encrypt: bool) -> Self {
        self.encrypt = encrypt;
        self
    }

    pub fn with_options(mut self, options: EmbedOptions) -> Self {
        self.options = options;
        self
    }
}

/// Inputs for an extract operation
#[derive(Debug, Clone)]
pub struct DecodeRequest {
    pub carrier: CarrierFile,
    pub password: String,
    pub encrypt: bool,
}

impl DecodeRequest {
    pub fn new(carrier: CarrierFile) -> Self {
        Self {
            carrier,
            password: String::new(),
            encrypt: true,
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    pub fn with_encryption(mut self, encrypt: bool) -> Self {
        self.encrypt = encrypt;
        self
    }
}

/// Runs embed/extract operations against a backend
pub struct Orchestrator<B: StegoBackend> {
    backend: B,
}

impl<B: StegoBackend> Orchestrator<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Hide a payload in a carrier
    pub async fn embed(
        &self,
        request: EncodeRequest,
        progress: &ProgressReporter,
    ) -> OperationReport<EmbedResult> {
        let EncodeRequest {
            carrier,
            payload,
            password,
            encrypt,
            options,
        } = request;

        self.execute(
            Direction::Embed,
            &carrier,
            &payload,
            &password,
            encrypt,
            &options,
            progress,
            parse_embed_response,
        )
        .await
    }

    /// Recover a payload from a carrier
    ///
    /// A carrier holding nothing yields an empty [`DecodeResult`], which is a
    /// success.
    pub async fn extract(
        &self,
        request: DecodeRequest,
        progress: &ProgressReporter,
    ) -> OperationReport<DecodeResult> {
        self.execute(
            Direction::Extract,
            &request.carrier,
            &SecretPayload::None,
            &request.password,
            request.encrypt,
            &EmbedOptions::default(),
            progress,
            parse_extract_response,
        )
        .await
    }

    #[allow(clippy::too_many_arguments)]
    async fn execute<T>(
        &self,
        direction: Direction,
        carrier: &CarrierFile,
        payload: &SecretPayload,
        password: &str,
        encrypt: bool,
        options: &EmbedOptions,
        progress: &ProgressReporter,
        parse: fn(Route, BackendResponse) -> StegoResult<T>,
    ) -> OperationReport<T> {
        let mut operation = Operation::new(direction, carrier.kind());
        info!(
            operation_id = %operation.id,
            kind = %operation.kind,
            direction = %direction,
            carrier_bytes = carrier.len(),
            "Starting stego operation"
        );
        progress.report(CHECKPOINT_STARTED);

        let outcome: StegoResult<T> = async {
            if encrypt && password.is_empty() {
                return Err(StegoError::precondition(
                    "A password is required when encryption is enabled",
                ));
            }

            let request = build_request(direction, carrier, payload, password, encrypt, options)?;
            let route = request.route;

            operation.transition(OperationState::dispatch);
            progress.report(CHECKPOINT_DISPATCHED);

            let response = self.backend.dispatch(request).await?;
            progress.complete();

            parse(route, response)
        }
        .await;

        match &outcome {
            Ok(_) => {
                operation.transition(OperationState::succeed);
                info!(operation_id = %operation.id, "Stego operation succeeded");
            }
            Err(e) => {
                operation.transition(OperationState::fail);
                warn!(operation_id = %operation.id, "Stego operation failed: {}", e);
            }
        }

        OperationReport { operation, outcome }
    }
}
