use serde_json::Value;
use wsync_store::{Collection, RecordStore};

use crate::error::{GateError, ValidationError};

// ---------------------------------------------------------------------------
// RecordCandidate
// ---------------------------------------------------------------------------

/// A record as assembled for a write, before it touches storage.
///
/// Fields stay loosely typed where clients can send the wrong shape:
/// `sortindex` is whatever JSON value arrived, `modified` is raw seconds.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RecordCandidate {
    pub id: Option<String>,
    pub collection: Option<Collection>,
    pub modified: Option<f64>,
    pub sortindex: Option<Value>,
    pub parentid: Option<String>,
    pub predecessorid: Option<String>,
    pub payload: Option<String>,
}

impl RecordCandidate {
    /// A candidate with only an id and a collection.
    pub fn new(id: impl Into<String>, collection: Collection) -> Self {
        Self {
            id: Some(id.into()),
            collection: Some(collection),
            ..Default::default()
        }
    }

    pub fn with_modified(mut self, secs: f64) -> Self {
        self.modified = Some(secs);
        self
    }

    pub fn with_sortindex(mut self, sortindex: impl Into<Value>) -> Self {
        self.sortindex = Some(sortindex.into());
        self
    }

    pub fn with_parentid(mut self, parentid: impl Into<String>) -> Self {
        self.parentid = Some(parentid.into());
        self
    }

    pub fn with_predecessorid(mut self, predecessorid: impl Into<String>) -> Self {
        self.predecessorid = Some(predecessorid.into());
        self
    }

    pub fn with_payload(mut self, payload: impl Into<String>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    /// Byte length of the payload, if any.
    pub fn payload_size(&self) -> Option<u64> {
        self.payload.as_ref().map(|p| p.len() as u64)
    }
}

// ---------------------------------------------------------------------------
// ValidationRule trait
// ---------------------------------------------------------------------------

/// A single independent check in the validation pipeline.
///
/// Every rule runs on every candidate; a rule's verdict never depends on
/// another rule's. Rules may read the store (for referential checks) but
/// must never write it.
///
/// The trait is object-safe and `Send + Sync` so rules can be stored in
/// a `Vec<Box<dyn ValidationRule>>`.
pub trait ValidationRule: Send + Sync {
    /// Human-readable name of this rule (e.g., "id", "payload").
    fn name(&self) -> &str;

    /// Check the candidate. `Ok(None)` means the rule is satisfied.
    fn check(
        &self,
        candidate: &RecordCandidate,
        store: &dyn RecordStore,
    ) -> Result<Option<ValidationError>, GateError>;
}
