use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use wsync_types::Timestamp;

use crate::record::Record;

/// A single filter category evaluated by the substrate against one
/// collection. Range bounds are exclusive; an absent bound is unbounded.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Predicate {
    /// Exact record id.
    Id(String),
    /// Membership in a set of record ids.
    Ids(Vec<String>),
    /// `sortindex` strictly between the given bounds.
    SortIndex {
        above: Option<i64>,
        below: Option<i64>,
    },
    /// `modified` strictly between the given bounds.
    Modified {
        newer: Option<Timestamp>,
        older: Option<Timestamp>,
    },
    /// Exact `parentid`.
    ParentId(String),
    /// Exact `predecessorid`.
    PredecessorId(String),
}

impl Predicate {
    /// Returns `true` if `record` satisfies this predicate.
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Self::Id(id) => record.id == *id,
            Self::Ids(ids) => ids.iter().any(|id| *id == record.id),
            Self::SortIndex { above, below } => {
                above.map_or(true, |a| record.sortindex > a)
                    && below.map_or(true, |b| record.sortindex < b)
            }
            Self::Modified { newer, older } => {
                newer.map_or(true, |n| record.modified > n)
                    && older.map_or(true, |o| record.modified < o)
            }
            Self::ParentId(p) => record.parentid.as_deref() == Some(p.as_str()),
            Self::PredecessorId(p) => record.predecessorid.as_deref() == Some(p.as_str()),
        }
    }

    /// Short name of the filter category, for logging.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Id(_) => "id",
            Self::Ids(_) => "ids",
            Self::SortIndex { .. } => "sortindex",
            Self::Modified { .. } => "modified",
            Self::ParentId(_) => "parentid",
            Self::PredecessorId(_) => "predecessorid",
        }
    }
}

/// Fold one predicate's key set into the running intersection.
///
/// `acc` is `None` before the first predicate. With a cap, `keys` is first
/// truncated to its `cap` smallest ids.
pub fn narrow(
    acc: Option<BTreeSet<String>>,
    keys: BTreeSet<String>,
    cap: Option<usize>,
) -> BTreeSet<String> {
    let keys = match cap {
        Some(cap) if keys.len() > cap => keys.into_iter().take(cap).collect(),
        _ => keys,
    };
    match acc {
        None => keys,
        Some(acc) => acc.intersection(&keys).cloned().collect(),
    }
}
