//! Error types for stegx-client
//!
//! Every operation ends in at most one of these. None are retried: the
//! caller decides whether to re-invoke.

use thiserror::Error;

/// Operation failure taxonomy
#[derive(Debug, Error)]
pub enum StegoError {
    /// A local precondition failed; no request was sent
    #[error("Invalid request: {0}")]
    PreconditionViolation(String),

    /// The backend could not be contacted at all
    #[error("Stego service unreachable at {endpoint} during {action}: {reason}")]
    TransportUnreachable {
        endpoint: String,
        action: String,
        reason: String,
    },

    /// The backend answered with a non-success status
    #[error("{message}")]
    BackendError {
        action: String,
        status: u16,
        message: String,
    },

    /// The backend answered with success but the body has the wrong shape
    #[error("Malformed response for {action}: {reason}")]
    MalformedResponse { action: String, reason: String },

    /// stegx-common error (I/O, configuration)
    #[error(transparent)]
    Common(#[from] stegx_common::Error),
}

impl StegoError {
    pub fn precondition(msg: impl Into<String>) -> Self {
        StegoError::PreconditionViolation(msg.into())
    }

    pub fn malformed(action: impl Into<String>, reason: impl ToString) -> Self {
        StegoError::MalformedResponse {
            action: action.into(),
            reason: reason.to_string(),
        }
    }

    /// True for failures detected before any network attempt
    pub fn is_precondition(&self) -> bool {
        matches!(self, StegoError::PreconditionViolation(_))
    }
}

/// Result type for stegx-client operations
pub type StegoResult<T> = Result<T, StegoError>;
