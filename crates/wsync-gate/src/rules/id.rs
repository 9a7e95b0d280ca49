use wsync_store::RecordStore;
use wsync_types::is_valid_record_id;

use crate::error::{GateError, ValidationError};
use crate::rule::{RecordCandidate, ValidationRule};

/// The id must be present, non-empty, at most 64 characters, and free of `/`.
pub struct IdRule;

impl ValidationRule for IdRule {
    fn name(&self) -> &str {
        "id"
    }

    fn check(
        &self,
        candidate: &RecordCandidate,
        _store: &dyn RecordStore,
    ) -> Result<Option<ValidationError>, GateError> {
        match candidate.id.as_deref() {
            Some(id) if is_valid_record_id(id) => Ok(None),
            _ => Ok(Some(ValidationError::InvalidId)),
        }
    }
}
