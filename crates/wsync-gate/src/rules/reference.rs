use wsync_store::RecordStore;
use wsync_types::is_valid_reference_id;

use crate::error::{GateError, ValidationError};
use crate::rule::{RecordCandidate, ValidationRule};

/// Which intra-collection link a [`ReferenceRule`] checks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReferenceField {
    ParentId,
    PredecessorId,
}

impl ReferenceField {
    fn value<'a>(&self, candidate: &'a RecordCandidate) -> Option<&'a str> {
        match self {
            Self::ParentId => candidate.parentid.as_deref(),
            Self::PredecessorId => candidate.predecessorid.as_deref(),
        }
    }

    fn error(&self) -> ValidationError {
        match self {
            Self::ParentId => ValidationError::InvalidParentId,
            Self::PredecessorId => ValidationError::InvalidPredecessorId,
        }
    }
}

/// A `parentid` or `predecessorid`, when present, must fit the length bound
/// and name a record that already exists in the same collection.
///
/// The existence lookup is skipped when the candidate has no collection.
pub struct ReferenceRule {
    field: ReferenceField,
}

impl ReferenceRule {
    pub fn new(field: ReferenceField) -> Self {
        Self { field }
    }

    pub fn parentid() -> Self {
        Self::new(ReferenceField::ParentId)
    }

    pub fn predecessorid() -> Self {
        Self::new(ReferenceField::PredecessorId)
    }
}

impl ValidationRule for ReferenceRule {
    fn name(&self) -> &str {
        match self.field {
            ReferenceField::ParentId => "parentid",
            ReferenceField::PredecessorId => "predecessorid",
        }
    }

    fn check(
        &self,
        candidate: &RecordCandidate,
        store: &dyn RecordStore,
    ) -> Result<Option<ValidationError>, GateError> {
        let Some(target) = self.field.value(candidate) else {
            return Ok(None);
        };
        if !is_valid_reference_id(target) {
            return Ok(Some(self.field.error()));
        }
        let Some(collection) = &candidate.collection else {
            return Ok(None);
        };
        if store.record_exists(&collection.id, target)? {
            Ok(None)
        } else {
            Ok(Some(self.field.error()))
        }
    }
}
