//! Foundation types for wsync.
//!
//! This crate provides the identity, naming, and temporal types shared by
//! every other wsync crate: the store substrate, the record validator, and
//! the sync engine.
//!
//! # Key Types
//!
//! - [`AccountId`]: UUID v7 identifier of an externally authenticated account
//! - [`Account`]: account identity plus its system-wide unique user name
//! - [`CollectionId`]: UUID v7 identifier of a per-account collection
//! - [`Timestamp`]: server-assigned modification time, two-decimal seconds
//! - [`names`]: length and character rules for record ids and collection names

pub mod error;
pub mod identity;
pub mod names;
pub mod temporal;

pub use error::TypeError;
pub use identity::{Account, AccountId, CollectionId};
pub use names::{
    is_valid_collection_name, is_valid_record_id, is_valid_reference_id, MAX_NAME_LEN,
};
pub use temporal::Timestamp;
