use wsync_store::StoreError;

/// A reason a candidate record was rejected.
///
/// The `Display` form is the reason string reported to clients.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, thiserror::Error)]
pub enum ValidationError {
    #[error("invalid id")]
    InvalidId,

    #[error("invalid collection")]
    InvalidCollection,

    #[error("invalid parentid")]
    InvalidParentId,

    #[error("invalid predecessorid")]
    InvalidPredecessorId,

    #[error("no modification date")]
    NoModificationDate,

    #[error("invalid modified date")]
    InvalidModifiedDate,

    #[error("invalid sortindex")]
    InvalidSortIndex,

    #[error("payload too large")]
    PayloadTooLarge,

    #[error("payload needs to be json-encoded")]
    PayloadNotJson,

    /// A new record was written without a payload.
    #[error("payload required")]
    MissingPayload,
}

impl serde::Serialize for ValidationError {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Errors that stop validation itself, as opposed to rejecting a record.
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    /// A referential lookup hit a storage failure.
    #[error("store error during validation: {0}")]
    Store(#[from] StoreError),

    /// A rule could not evaluate the candidate.
    #[error("rule error in '{rule}': {message}")]
    RuleError { rule: String, message: String },
}

impl GateError {
    /// Create a rule error with a name and message.
    pub fn rule(rule: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RuleError {
            rule: rule.into(),
            message: message.into(),
        }
    }
}
