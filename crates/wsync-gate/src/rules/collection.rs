use wsync_store::RecordStore;
use wsync_types::is_valid_collection_name;

use crate::error::{GateError, ValidationError};
use crate::rule::{RecordCandidate, ValidationRule};

/// A collection must be resolved and its name must fit the length bound.
pub struct CollectionRule;

impl ValidationRule for CollectionRule {
    fn name(&self) -> &str {
        "collection"
    }

    fn check(
        &self,
        candidate: &RecordCandidate,
        _store: &dyn RecordStore,
    ) -> Result<Option<ValidationError>, GateError> {
        match &candidate.collection {
            Some(c) if is_valid_collection_name(&c.name) => Ok(None),
            _ => Ok(Some(ValidationError::InvalidCollection)),
        }
    }
}
