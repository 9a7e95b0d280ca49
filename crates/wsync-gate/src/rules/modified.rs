use wsync_store::RecordStore;

use crate::error::{GateError, ValidationError};
use crate::rule::{RecordCandidate, ValidationRule};

/// `modified` must be set, non-zero, and a finite number of seconds.
pub struct ModifiedRule;

impl ValidationRule for ModifiedRule {
    fn name(&self) -> &str {
        "modified"
    }

    fn check(
        &self,
        candidate: &RecordCandidate,
        _store: &dyn RecordStore,
    ) -> Result<Option<ValidationError>, GateError> {
        Ok(match candidate.modified {
            None => Some(ValidationError::NoModificationDate),
            Some(secs) if secs == 0.0 => Some(ValidationError::NoModificationDate),
            Some(secs) if !secs.is_finite() => Some(ValidationError::InvalidModifiedDate),
            Some(_) => None,
        })
    }
}
