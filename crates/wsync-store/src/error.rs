use wsync_types::CollectionId;

/// Errors from the storage substrate.
///
/// These are never folded into validation results: callers see them as a
/// distinct failure kind and decide their own retry policy.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backend is temporarily unavailable.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A concurrent writer held the key; the operation may be retried.
    #[error("contention on {0}")]
    Contention(String),

    /// An account with this user name is already registered.
    #[error("account already exists: {0}")]
    AccountExists(String),

    /// The collection does not exist (or was deleted mid-operation).
    #[error("collection not found: {0}")]
    CollectionNotFound(CollectionId),

    /// A lock guarding backend state was poisoned by a panicking writer.
    #[error("lock poisoned: {0}")]
    Poisoned(String),
}

impl StoreError {
    /// Returns `true` for failures that may succeed if the call is repeated.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Contention(_))
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
