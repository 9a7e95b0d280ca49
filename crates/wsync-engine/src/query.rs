//! Filtered, sorted, paginated record retrieval.
//!
//! Every supplied filter category is evaluated on its own against the whole
//! collection. The resulting key sets are intersected, the surviving records
//! are fetched and sorted, and the page selected by `(offset, limit)` is
//! projected to ids or full views.

use std::cmp::Ordering;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;
use wsync_store::{Collection, Predicate, Record, RecordStore, RecordView};
use wsync_types::Timestamp;

use crate::error::{EngineError, EngineResult};

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Result ordering.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// `sortindex` ascending.
    #[default]
    Index,
    /// `modified` ascending.
    Oldest,
    /// `modified` descending.
    Newest,
}

impl SortOrder {
    /// Parse a sort name. Unrecognized names fall back to [`SortOrder::Index`].
    pub fn parse_lenient(name: &str) -> Self {
        match name {
            "oldest" => Self::Oldest,
            "newest" => Self::Newest,
            _ => Self::Index,
        }
    }

    fn compare(self, a: &Record, b: &Record) -> Ordering {
        let primary = match self {
            Self::Index => a.sortindex.cmp(&b.sortindex),
            Self::Oldest => a.modified.cmp(&b.modified),
            Self::Newest => b.modified.cmp(&a.modified),
        };
        primary.then_with(|| a.id.cmp(&b.id))
    }
}

/// Options for a single retrieval. Every field is optional; a present
/// field is applied even when its value is zero or empty.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryOptions {
    /// Project full records instead of ids.
    pub full: bool,
    pub id: Option<String>,
    pub ids: Option<Vec<String>>,
    pub parentid: Option<String>,
    pub predecessorid: Option<String>,
    /// Exclusive lower bound on `sortindex`.
    pub index_above: Option<i64>,
    /// Exclusive upper bound on `sortindex`.
    pub index_below: Option<i64>,
    /// Exclusive lower bound on `modified`.
    pub newer: Option<Timestamp>,
    /// Exclusive upper bound on `modified`.
    pub older: Option<Timestamp>,
    pub sort: Option<SortOrder>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn full(mut self) -> Self {
        self.full = true;
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ids = Some(ids.into_iter().map(Into::into).collect());
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

    pub fn with_index_above(mut self, bound: i64) -> Self {
        self.index_above = Some(bound);
        self
    }

    pub fn with_index_below(mut self, bound: i64) -> Self {
        self.index_below = Some(bound);
        self
    }

    pub fn with_newer(mut self, bound: Timestamp) -> Self {
        self.newer = Some(bound);
        self
    }

    pub fn with_older(mut self, bound: Timestamp) -> Self {
        self.older = Some(bound);
        self
    }

    pub fn with_sort(mut self, sort: SortOrder) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Build options from string request parameters.
    ///
    /// `ids` is comma separated; `full` is false for `""`, `"0"` and
    /// `"false"`; `sort` falls back to index order for unknown names.
    /// Unknown keys are ignored. Values that fail to parse are reported.
    pub fn from_params<I, K, V>(params: I) -> EngineResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut options = Self::default();
        for (key, value) in params {
            let (key, value) = (key.as_ref(), value.as_ref());
            match key {
                "full" => options.full = !matches!(value, "" | "0" | "false"),
                "id" => options.id = Some(value.to_string()),
                "ids" => {
                    options.ids = Some(
                        value
                            .split(',')
                            .map(str::trim)
                            .filter(|id| !id.is_empty())
                            .map(str::to_string)
                            .collect(),
                    )
                }
                "parentid" => options.parentid = Some(value.to_string()),
                "predecessorid" => options.predecessorid = Some(value.to_string()),
                "index_above" => options.index_above = Some(parse_param(key, value)?),
                "index_below" => options.index_below = Some(parse_param(key, value)?),
                "newer" => options.newer = Some(parse_timestamp(key, value)?),
                "older" => options.older = Some(parse_timestamp(key, value)?),
                "sort" => options.sort = Some(SortOrder::parse_lenient(value)),
                "limit" => options.limit = Some(parse_param(key, value)?),
                "offset" => options.offset = Some(parse_param(key, value)?),
                _ => {}
            }
        }
        Ok(options)
    }

    /// The filter categories these options supply, one predicate each.
    pub fn predicates(&self) -> Vec<Predicate> {
        let mut out = Vec::new();
        if let Some(id) = &self.id {
            out.push(Predicate::Id(id.clone()));
        }
        if let Some(ids) = &self.ids {
            out.push(Predicate::Ids(ids.clone()));
        }
        if self.index_above.is_some() || self.index_below.is_some() {
            out.push(Predicate::SortIndex {
                above: self.index_above,
                below: self.index_below,
            });
        }
        if self.newer.is_some() || self.older.is_some() {
            out.push(Predicate::Modified {
                newer: self.newer,
                older: self.older,
            });
        }
        if let Some(parentid) = &self.parentid {
            out.push(Predicate::ParentId(parentid.clone()));
        }
        if let Some(predecessorid) = &self.predecessorid {
            out.push(Predicate::PredecessorId(predecessorid.clone()));
        }
        out
    }
}

fn parse_param<T>(key: &str, value: &str) -> EngineResult<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| EngineError::invalid_option(key, format!("{value:?}: {e}")))
}

fn parse_timestamp(key: &str, value: &str) -> EngineResult<Timestamp> {
    let secs: f64 = parse_param(key, value)?;
    Timestamp::try_from_secs(secs).map_err(|e| EngineError::invalid_option(key, e.to_string()))
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// One element of a retrieval: a bare id, or a full record view.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RetrievedItem {
    Id(String),
    Full(RecordView),
}

impl RetrievedItem {
    pub fn id(&self) -> &str {
        match self {
            Self::Id(id) => id,
            Self::Full(view) => &view.id,
        }
    }
}

/// The page of a retrieval, projected lazily as it is iterated.
///
/// Holds no cursor into the store: running the same query again against the
/// same state yields the same sequence.
#[derive(Debug)]
pub struct Retrieval {
    records: std::vec::IntoIter<Record>,
    full: bool,
}

impl Retrieval {
    fn new(records: Vec<Record>, full: bool) -> Self {
        Self {
            records: records.into_iter(),
            full,
        }
    }

    /// Collect just the ids, whatever the projection.
    pub fn ids(self) -> Vec<String> {
        self.map(|item| match item {
            RetrievedItem::Id(id) => id,
            RetrievedItem::Full(view) => view.id,
        })
        .collect()
    }
}

impl Iterator for Retrieval {
    type Item = RetrievedItem;

    fn next(&mut self) -> Option<Self::Item> {
        let record = self.records.next()?;
        Some(if self.full {
            RetrievedItem::Full(record.to_view())
        } else {
            RetrievedItem::Id(record.id)
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.records.size_hint()
    }
}

impl ExactSizeIterator for Retrieval {}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Answers retrieval queries scoped to one collection.
pub struct QueryEngine {
    store: Arc<dyn RecordStore>,
    default_limit: usize,
    cap_filters: bool,
}

impl QueryEngine {
    pub fn new(store: Arc<dyn RecordStore>, default_limit: usize, cap_filters: bool) -> Self {
        Self {
            store,
            default_limit,
            cap_filters,
        }
    }

    /// Run `options` against `collection`.
    pub fn retrieve(&self, collection: &Collection, options: &QueryOptions) -> EngineResult<Retrieval> {
        let limit = options.limit.unwrap_or(self.default_limit);
        let offset = options.offset.unwrap_or(0);
        let predicates = options.predicates();

        let cap = self.cap_filters.then_some(limit);
        let mut records = self.store.select_records(&collection.id, &predicates, cap)?;

        let sort = options.sort.unwrap_or_default();
        records.sort_by(|a, b| sort.compare(a, b));
        let total = records.len();
        let page: Vec<Record> = records.into_iter().skip(offset).take(limit).collect();

        debug!(
            collection = %collection.id,
            filters = predicates.len(),
            ?sort,
            matched = total,
            returned = page.len(),
            "records retrieved"
        );
        Ok(Retrieval::new(page, options.full))
    }
}

impl std::fmt::Debug for QueryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryEngine")
            .field("default_limit", &self.default_limit)
            .field("cap_filters", &self.cap_filters)
            .finish()
    }
}
