use thiserror::Error;
use uuid::Uuid;

/// Result alias for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Error type surfaced by ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Allocation was requested with an empty sequence key.
    #[error("sequence key must not be empty")]
    InvalidSequenceKey,
    /// A persist hit the unique receipt index. Recoverable once by
    /// allocating a fresh number and retrying.
    #[error("receipt number already in use: {0}")]
    DuplicateReceipt(String),
    /// The retried persist collided again. Fatal for the request.
    #[error("receipt number {0} still conflicted after retry")]
    AllocationConflict(String),
    /// The counter backend could not perform the atomic increment.
    #[error("counter store unavailable: {0}")]
    CounterUnavailable(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("payment {0} not found")]
    NotFound(Uuid),
}

impl From<rusqlite::Error> for LedgerError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Storage(value.to_string())
    }
}

impl From<std::io::Error> for LedgerError {
    fn from(value: std::io::Error) -> Self {
        Self::Storage(value.to_string())
    }
}
