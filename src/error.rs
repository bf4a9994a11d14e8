use thiserror::Error;

use crate::blockchain::chain::ChainError;
use crate::mempool::MempoolError;
use crate::mining::MiningError;
use crate::state::StateError;

/// Facade-level error returned by the node API.
///
/// Every module error collapses into one of these kinds. Commands surface the
/// kind plus a human-readable message; queries only ever fail with `NotFound`.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Malformed input, rejected at the API boundary. Never retried.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Well-formed request that contradicts current state. Not retried.
    #[error("rejected by current state: {0}")]
    Consistency(String),

    /// Transient condition; the next mining round retries with fresh inputs.
    #[error("transient failure: {0}")]
    Transient(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// Invariant violation detected at runtime. The core refuses further
    /// writes until restarted.
    #[error("fatal invariant violation: {0}")]
    Fatal(String),
}

impl CoreError {
    /// Stable kind identifier for external observers.
    pub fn kind(&self) -> &'static str {
        match self {
            CoreError::Validation(_) => "validation",
            CoreError::Consistency(_) => "consistency",
            CoreError::Transient(_) => "transient",
            CoreError::NotFound(_) => "not_found",
            CoreError::Fatal(_) => "fatal",
        }
    }
}

impl From<MempoolError> for CoreError {
    fn from(err: MempoolError) -> Self {
        match err {
            MempoolError::InvalidTransaction(msg) => CoreError::Validation(msg),
            other => CoreError::Consistency(other.to_string()),
        }
    }
}

impl From<StateError> for CoreError {
    fn from(err: StateError) -> Self {
        match err {
            StateError::Overflow(_) => CoreError::Fatal(err.to_string()),
            other => CoreError::Consistency(other.to_string()),
        }
    }
}

impl From<ChainError> for CoreError {
    fn from(err: ChainError) -> Self {
        match err {
            ChainError::StateRejected(inner) => inner.into(),
            ChainError::NotFound(index) => CoreError::NotFound(format!("block {index}")),
            other => CoreError::Consistency(other.to_string()),
        }
    }
}

impl From<MiningError> for CoreError {
    fn from(err: MiningError) -> Self {
        match err {
            MiningError::NonceExhausted => CoreError::Transient(err.to_string()),
            MiningError::Cancelled => CoreError::Transient(err.to_string()),
            MiningError::EmptyRound => CoreError::Consistency(err.to_string()),
            MiningError::AlreadyRunning | MiningError::NotRunning => {
                CoreError::Consistency(err.to_string())
            }
            MiningError::StateRejected(msg) => CoreError::Consistency(msg),
            MiningError::Halted => CoreError::Fatal(err.to_string()),
        }
    }
}
