use dslab_mempool::StreamError;
use dslab_service::ServiceError;
use dslab_types::{ErrorKind, ValidationError};
use thiserror::Error;

/// An operation was attempted before its preconditions were met.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("cannot {operation}: {reason}")]
pub struct InvalidState {
    pub operation: &'static str,
    pub reason: String,
}

impl InvalidState {
    pub fn new(operation: &'static str, reason: impl Into<String>) -> Self {
        Self {
            operation,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    InvalidState(#[from] InvalidState),

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("mempool stream error: {0}")]
    Stream(#[from] StreamError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl SessionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidState(_) => ErrorKind::InvalidState,
            Self::Service(error) => error.kind(),
            Self::Stream(_) => ErrorKind::Service,
            Self::Validation(_) => ErrorKind::Validation,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(
            SessionError::from(InvalidState::new("craft a pair", "no UTXO selected")).kind(),
            ErrorKind::InvalidState
        );
        assert_eq!(
            SessionError::from(ServiceError::Timeout(Duration::from_secs(1))).kind(),
            ErrorKind::Service
        );
        assert_eq!(
            SessionError::from(ServiceError::Rejected("txn-mempool-conflict".to_string())).kind(),
            ErrorKind::Rejection
        );
        assert_eq!(
            SessionError::from(ValidationError::ZeroFeeRate).kind(),
            ErrorKind::Validation
        );
    }

    #[test]
    fn test_invalid_state_message() {
        let error = InvalidState::new("broadcast", "no candidate pair");
        assert_eq!(error.to_string(), "cannot broadcast: no candidate pair");
    }
}
