//! Built-in validation rules, in the order the default pipeline runs them.

pub mod collection;
pub mod id;
pub mod modified;
pub mod payload;
pub mod reference;
pub mod sortindex;

pub use collection::CollectionRule;
pub use id::IdRule;
pub use modified::ModifiedRule;
pub use payload::PayloadRule;
pub use reference::{ReferenceField, ReferenceRule};
pub use sortindex::{SortIndexRule, SORTINDEX_MAX, SORTINDEX_MIN};
