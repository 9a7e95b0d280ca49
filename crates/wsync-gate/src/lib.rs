//! Record validation gate for wsync.
//!
//! Every record write is assembled into a [`RecordCandidate`] and passed
//! through the validator before anything touches storage. The validator runs
//! a pipeline of independent rules (id, collection, references, modified,
//! sortindex, payload) and reports every violation it finds, so clients get
//! the complete list of problems with a record in one round trip.
//!
//! # Quick Start
//!
//! ```rust
//! use wsync_gate::{RecordCandidate, RecordValidator, ValidationError};
//! use wsync_store::{InMemoryRecordStore, RecordStore};
//!
//! let store = InMemoryRecordStore::new();
//! let account = store.create_account("alice").unwrap();
//! let tabs = store.get_or_create_collection(&account.id, "tabs").unwrap();
//!
//! let validator = RecordValidator::default();
//! let candidate = RecordCandidate::new("a/b", tabs).with_modified(1700000000.0);
//! let errors = validator.validate(&candidate, &store).unwrap();
//! assert_eq!(errors, vec![ValidationError::InvalidId, ValidationError::MissingPayload]);
//! ```

pub mod config;
pub mod error;
pub mod rule;
pub mod rules;
pub mod validator;

// Re-exports for convenience.
pub use config::{ValidatorConfig, DEFAULT_MAX_PAYLOAD_BYTES};
pub use error::{GateError, ValidationError};
pub use rule::{RecordCandidate, ValidationRule};
pub use rules::{
    CollectionRule, IdRule, ModifiedRule, PayloadRule, ReferenceField, ReferenceRule,
    SortIndexRule,
};
pub use validator::RecordValidator;
