use std::time::Duration;

use bitcoin::{OutPoint, Txid};
use dslab_types::{ErrorKind, Slot, ValidationError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("unexpected HTTP status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response: {0}")]
    Malformed(String),

    /// The service answered with `{ error }` to a key or UTXO request.
    #[error("service error: {0}")]
    Remote(String),

    /// The service refused to craft or broadcast. The reason is passed through untouched.
    #[error("rejected: {0}")]
    Rejected(String),

    #[error("invalid request: {0}")]
    Validation(#[from] ValidationError),

    #[error("protocol violation: {0}")]
    ProtocolViolation(#[from] ProtocolViolation),
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Http(..)
            | Self::Timeout(..)
            | Self::Status { .. }
            | Self::Malformed(..)
            | Self::Remote(..) => ErrorKind::Service,
            Self::Rejected(..) => ErrorKind::Rejection,
            Self::Validation(..) => ErrorKind::Validation,
            Self::ProtocolViolation(..) => ErrorKind::ProtocolViolation,
        }
    }

    /// The verbatim rejection reason, if the service refused the request.
    pub fn rejection_reason(&self) -> Option<&str> {
        match self {
            Self::Rejected(reason) => Some(reason),
            _ => None,
        }
    }
}

/// The crafting service returned a pair that is not a double-spend of the requested output.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProtocolViolation {
    #[error("{slot} does not spend {expected}, its inputs are {found:?}")]
    InputMismatch {
        slot: Slot,
        expected: OutPoint,
        found: Vec<OutPoint>,
    },

    #[error("{slot} was reported as {reported} but its transaction hashes to {computed}")]
    TxidMismatch {
        slot: Slot,
        reported: Txid,
        computed: Txid,
    },

    #[error("both candidates are the same transaction {0}")]
    IdenticalCandidates(Txid),
}
