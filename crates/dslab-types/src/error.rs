use thiserror::Error;

/// How a failure should be handled by whoever triggered the operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad local input. Nothing changed; ask again.
    Validation,
    /// Transport, timeout or malformed response. State is kept and the call can be retried.
    Service,
    /// The service or the network refused the request.
    Rejection,
    /// The remote service broke a guarantee it makes about its responses.
    ProtocolViolation,
    /// The operation is not allowed in the current session state.
    InvalidState,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing {0}")]
    Missing(&'static str),

    #[error("invalid address {address:?}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("address {address:?} is not valid on {network}")]
    WrongNetwork { address: String, network: String },

    #[error("fee rate must be at least 1 sat/vB")]
    ZeroFeeRate,

    #[error("no UTXO at index {index}, {len} loaded")]
    UtxoIndexOutOfRange { index: usize, len: usize },
}
