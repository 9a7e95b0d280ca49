use serde::de::IgnoredAny;
use wsync_store::RecordStore;

use crate::error::{GateError, ValidationError};
use crate::rule::{RecordCandidate, ValidationRule};

/// Payload checks.
///
/// - A supplied payload larger than `max_bytes` is "too large"; only a payload
///   within the limit is parsed, and it must be JSON text.
/// - A write that omits the payload is only valid as an update to a record
///   that already exists.
pub struct PayloadRule {
    max_bytes: usize,
}

impl PayloadRule {
    /// `max_bytes == 0` disables the size check.
    pub fn new(max_bytes: usize) -> Self {
        Self { max_bytes }
    }
}

impl ValidationRule for PayloadRule {
    fn name(&self) -> &str {
        "payload"
    }

    fn check(
        &self,
        candidate: &RecordCandidate,
        store: &dyn RecordStore,
    ) -> Result<Option<ValidationError>, GateError> {
        let Some(payload) = &candidate.payload else {
            return match (&candidate.collection, &candidate.id) {
                (Some(collection), Some(id)) if !store.record_exists(&collection.id, id)? => {
                    Ok(Some(ValidationError::MissingPayload))
                }
                _ => Ok(None),
            };
        };

        if self.max_bytes > 0 && payload.len() > self.max_bytes {
            return Ok(Some(ValidationError::PayloadTooLarge));
        }
        if serde_json::from_str::<IgnoredAny>(payload).is_err() {
            return Ok(Some(ValidationError::PayloadNotJson));
        }
        Ok(None)
    }
}
