//! Record storage substrate for wsync.
//!
//! This crate defines the storage interface the sync core depends on and an
//! in-memory implementation of it. The substrate holds three kinds of state:
//!
//! - accounts, referenced by id and by unique user name,
//! - collections, unique per `(account, name)`,
//! - records (WBOs), unique per `(collection, id)`.
//!
//! # Storage Backends
//!
//! All backends implement the [`RecordStore`] trait:
//!
//! - [`InMemoryRecordStore`] -- `RwLock`-guarded maps for tests and embedding
//!
//! # Design Rules
//!
//! 1. Collection get-or-create is atomic per `(account, name)`.
//! 2. Record writes are atomic read-modify-writes per `(collection, id)`.
//! 3. The store never interprets payloads -- validation happens upstream.
//! 4. Removing a collection removes the records it owns.
//! 5. All backend errors are propagated, never silently ignored.

pub mod error;
pub mod filter;
pub mod memory;
pub mod record;
pub mod traits;

// Re-export primary types at crate root for ergonomic imports.
pub use error::{StoreError, StoreResult};
pub use filter::Predicate;
pub use memory::InMemoryRecordStore;
pub use record::{Collection, Record, RecordPatch, RecordView};
pub use traits::RecordStore;
