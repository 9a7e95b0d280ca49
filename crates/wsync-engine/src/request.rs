use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use wsync_gate::ValidationError;
use wsync_store::Record;
use wsync_types::{AccountId, CollectionId, Timestamp};

use crate::error::{EngineError, EngineResult};

/// How a write names its account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountRef {
    Id(AccountId),
    UserName(String),
}

impl From<AccountId> for AccountRef {
    fn from(id: AccountId) -> Self {
        Self::Id(id)
    }
}

impl From<&str> for AccountRef {
    fn from(user_name: &str) -> Self {
        Self::UserName(user_name.to_string())
    }
}

/// The collection a write goes to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollectionTarget {
    /// An existing collection, by id.
    Collection(CollectionId),
    /// A collection by owner and name; created on first use.
    Named { account: AccountRef, name: String },
}

/// A single record write.
///
/// Only the recognized mutable fields are carried; anything else a client
/// sends is dropped when the request is built. `sortindex` stays a raw JSON
/// value so that wrong-typed input reaches the validator and is reported as
/// a validation error rather than a parse failure.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WriteRequest {
    pub target: Option<CollectionTarget>,
    pub id: Option<String>,
    pub sortindex: Option<Value>,
    pub parentid: Option<String>,
    pub predecessorid: Option<String>,
    pub payload: Option<String>,
}

impl WriteRequest {
    /// A write to the collection `name` of `account`.
    pub fn named(
        account: impl Into<AccountRef>,
        name: impl Into<String>,
        id: impl Into<String>,
    ) -> Self {
        Self {
            target: Some(CollectionTarget::Named {
                account: account.into(),
                name: name.into(),
            }),
            id: Some(id.into()),
            ..Default::default()
        }
    }

    /// A write to an existing collection.
    pub fn in_collection(collection: CollectionId, id: impl Into<String>) -> Self {
        Self {
            target: Some(CollectionTarget::Collection(collection)),
            id: Some(id.into()),
            ..Default::default()
        }
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

    /// Build a request from a JSON mapping.
    ///
    /// The target is taken from `collection` (a collection id) or, failing
    /// that, from `user_name` / `account` plus `collection_name`. A
    /// `collection` value that is not a valid id leaves the request without
    /// a target. Unknown keys are ignored. String fields holding non-string
    /// values are rejected as malformed input.
    pub fn from_json(value: &Value) -> EngineResult<Self> {
        let map = value
            .as_object()
            .ok_or_else(|| EngineError::invalid_request("<root>", "expected a JSON object"))?;

        let target = if let Some(collection) = string_field(map, "collection")? {
            collection.parse().ok().map(CollectionTarget::Collection)
        } else {
            let account = match (string_field(map, "account")?, string_field(map, "user_name")?) {
                (Some(id), _) => Some(AccountRef::Id(id.parse().map_err(|e| {
                    EngineError::invalid_request("account", format!("{e}"))
                })?)),
                (None, Some(user_name)) => Some(AccountRef::UserName(user_name)),
                (None, None) => None,
            };
            match (account, string_field(map, "collection_name")?) {
                (Some(account), Some(name)) => Some(CollectionTarget::Named { account, name }),
                _ => None,
            }
        };

        Ok(Self {
            target,
            id: string_field(map, "id")?,
            sortindex: map.get("sortindex").filter(|v| !v.is_null()).cloned(),
            parentid: string_field(map, "parentid")?,
            predecessorid: string_field(map, "predecessorid")?,
            payload: string_field(map, "payload")?,
        })
    }
}

fn string_field(map: &Map<String, Value>, key: &str) -> EngineResult<Option<String>> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(EngineError::invalid_request(
            key,
            format!("expected a string, got {other}"),
        )),
    }
}

/// Result of a single write: the stored record, or the reasons it was
/// rejected. Exactly one of the two is non-empty.
#[derive(Clone, Debug, PartialEq)]
pub struct WriteOutcome {
    pub record: Option<Record>,
    pub errors: Vec<ValidationError>,
}

impl WriteOutcome {
    pub fn accepted(record: Record) -> Self {
        Self {
            record: Some(record),
            errors: Vec::new(),
        }
    }

    pub fn rejected(errors: Vec<ValidationError>) -> Self {
        Self {
            record: None,
            errors,
        }
    }

    pub fn is_accepted(&self) -> bool {
        self.errors.is_empty() && self.record.is_some()
    }

    /// The rejection reasons as client-facing strings.
    pub fn reasons(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }
}

/// Result of a batch of writes: which ids were stored and why the others
/// were not.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct BatchOutcome {
    /// Latest `modified` among accepted writes.
    pub modified: Option<Timestamp>,
    pub success: Vec<String>,
    pub failed: BTreeMap<String, Vec<ValidationError>>,
}

impl BatchOutcome {
    pub(crate) fn record(&mut self, id: Option<&str>, outcome: WriteOutcome) {
        match outcome.record {
            Some(record) => {
                self.modified = Some(self.modified.map_or(record.modified, |m| m.max(record.modified)));
                self.success.push(record.id);
            }
            None => {
                self.failed
                    .entry(id.unwrap_or_default().to_string())
                    .or_default()
                    .extend(outcome.errors);
            }
        }
    }
}
