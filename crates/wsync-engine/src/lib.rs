//! Sync storage engine.
//!
//! Ties the record validator, the collection registry, the upsert path and
//! the query engine together over a single [`RecordStore`]. This is the main
//! entry point for applications embedding the storage core.
//!
//! ```
//! use wsync_engine::{QueryOptions, SyncEngine, WriteRequest};
//!
//! let engine = SyncEngine::in_memory();
//! let alice = engine.create_account("alice").unwrap();
//!
//! let outcome = engine
//!     .insert_or_update(&WriteRequest::named(alice.id, "tabs", "t1").with_payload("{}"))
//!     .unwrap();
//! assert!(outcome.is_accepted());
//!
//! let tabs = engine.collection(&alice.id, "tabs").unwrap();
//! let ids = engine.retrieve(&tabs, &QueryOptions::new()).unwrap().ids();
//! assert_eq!(ids, vec!["t1"]);
//! ```

pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod query;
pub mod registry;
pub mod request;
pub mod upsert;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::EngineConfig;
pub use engine::SyncEngine;
pub use error::{EngineError, EngineResult};
pub use query::{QueryEngine, QueryOptions, RetrievedItem, Retrieval, SortOrder};
pub use registry::{is_builtin, CollectionRegistry, BUILTIN_COLLECTIONS};
pub use request::{AccountRef, BatchOutcome, CollectionTarget, WriteOutcome, WriteRequest};
pub use upsert::UpsertEngine;

// Re-export key types
pub use wsync_gate::{RecordCandidate, RecordValidator, ValidationError, ValidatorConfig};
pub use wsync_store::{Collection, InMemoryRecordStore, Record, RecordStore, RecordView, StoreError};
pub use wsync_types::{Account, AccountId, CollectionId, Timestamp};
