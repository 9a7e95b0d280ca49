use wsync_store::RecordStore;

use crate::error::{GateError, ValidationError};
use crate::rule::{RecordCandidate, ValidationRule};

pub const SORTINDEX_MIN: i64 = -999_999_999;
pub const SORTINDEX_MAX: i64 = 999_999_999;

/// When present, `sortindex` must be a JSON integer within
/// [`SORTINDEX_MIN`, `SORTINDEX_MAX`]. Floats (even integral ones), strings,
/// and booleans are rejected.
pub struct SortIndexRule;

impl ValidationRule for SortIndexRule {
    fn name(&self) -> &str {
        "sortindex"
    }

    fn check(
        &self,
        candidate: &RecordCandidate,
        _store: &dyn RecordStore,
    ) -> Result<Option<ValidationError>, GateError> {
        let Some(value) = &candidate.sortindex else {
            return Ok(None);
        };
        match value.as_i64() {
            Some(n) if (SORTINDEX_MIN..=SORTINDEX_MAX).contains(&n) => Ok(None),
            _ => Ok(Some(ValidationError::InvalidSortIndex)),
        }
    }
}
