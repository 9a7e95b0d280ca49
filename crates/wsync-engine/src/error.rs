use thiserror::Error;

/// Errors surfaced by the sync engine.
///
/// Record validation failures are not errors: they are reported in a
/// [`WriteOutcome`](crate::WriteOutcome). Everything here is a failure of the
/// call itself.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("store error: {0}")]
    Store(#[from] wsync_store::StoreError),

    #[error("validation gate error: {0}")]
    Gate(#[from] wsync_gate::GateError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid query option '{option}': {reason}")]
    InvalidOption { option: String, reason: String },

    /// A write request mapping had a field of the wrong shape.
    #[error("invalid request field '{field}': {reason}")]
    InvalidRequest { field: String, reason: String },

    #[error("account not found: {0}")]
    AccountNotFound(String),
}

impl EngineError {
    /// Create an invalid-option error.
    pub fn invalid_option(option: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidOption {
            option: option.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid-request error.
    pub fn invalid_request(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRequest {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Returns `true` if retrying the call may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Store(e) => e.is_transient(),
            Self::Gate(wsync_gate::GateError::Store(e)) => e.is_transient(),
            _ => false,
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
