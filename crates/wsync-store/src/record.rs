use serde::{Deserialize, Serialize};
use wsync_types::{AccountId, CollectionId, Timestamp};

// ---------------------------------------------------------------------------
// Collection
// ---------------------------------------------------------------------------

/// A named group of records owned by one account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    pub id: CollectionId,
    pub account: AccountId,
    pub name: String,
    pub created: Timestamp,
}

impl Collection {
    pub fn new(account: AccountId, name: impl Into<String>, created: Timestamp) -> Self {
        Self {
            id: CollectionId::new(),
            account,
            name: name.into(),
            created,
        }
    }
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// A stored WBO: one versioned JSON payload, unique by id within its
/// collection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub collection: CollectionId,
    pub id: String,
    pub modified: Timestamp,
    pub sortindex: i64,
    pub parentid: Option<String>,
    pub predecessorid: Option<String>,
    pub payload: String,
    /// Byte length of `payload`.
    pub payload_size: u64,
}

impl Record {
    /// Build a new record from a patch, filling absent fields with defaults.
    pub fn from_patch(
        collection: CollectionId,
        id: impl Into<String>,
        patch: &RecordPatch,
        modified: Timestamp,
    ) -> Self {
        let payload = patch.payload.clone().unwrap_or_default();
        Self {
            collection,
            id: id.into(),
            modified,
            sortindex: patch.sortindex.unwrap_or(0),
            parentid: patch.parentid.clone(),
            predecessorid: patch.predecessorid.clone(),
            payload_size: payload.len() as u64,
            payload,
        }
    }

    /// Overwrite the fields present in `patch`; everything else is kept.
    /// `modified` is always rewritten.
    pub fn apply(&mut self, patch: &RecordPatch, modified: Timestamp) {
        if let Some(sortindex) = patch.sortindex {
            self.sortindex = sortindex;
        }
        if let Some(parentid) = &patch.parentid {
            self.parentid = Some(parentid.clone());
        }
        if let Some(predecessorid) = &patch.predecessorid {
            self.predecessorid = Some(predecessorid.clone());
        }
        if let Some(payload) = &patch.payload {
            self.payload_size = payload.len() as u64;
            self.payload = payload.clone();
        }
        self.modified = modified;
    }

    /// Full representation: every non-empty field plus `id`.
    pub fn to_view(&self) -> RecordView {
        RecordView {
            id: self.id.clone(),
            sortindex: (self.sortindex != 0).then_some(self.sortindex),
            parentid: self.parentid.clone().filter(|p| !p.is_empty()),
            predecessorid: self.predecessorid.clone().filter(|p| !p.is_empty()),
            payload: (!self.payload.is_empty()).then(|| self.payload.clone()),
            payload_size: (self.payload_size != 0).then_some(self.payload_size),
            modified: (!self.modified.is_zero()).then_some(self.modified),
        }
    }
}

// ---------------------------------------------------------------------------
// RecordPatch
// ---------------------------------------------------------------------------

/// The mutable fields of a write. Each field is either absent (left
/// untouched on merge) or present with a value (overwrites).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordPatch {
    pub sortindex: Option<i64>,
    pub parentid: Option<String>,
    pub predecessorid: Option<String>,
    pub payload: Option<String>,
}

impl RecordPatch {
    /// Returns `true` if no field is present.
    pub fn is_empty(&self) -> bool {
        self.sortindex.is_none()
            && self.parentid.is_none()
            && self.predecessorid.is_none()
            && self.payload.is_none()
    }
}

// ---------------------------------------------------------------------------
// RecordView
// ---------------------------------------------------------------------------

/// Mapping representation of a record as returned by full retrievals.
/// Zero-valued and empty fields are omitted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecordView {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sortindex: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parentid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predecessorid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<Timestamp>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patch(payload: &str) -> RecordPatch {
        RecordPatch {
            payload: Some(payload.into()),
            ..Default::default()
        }
    }

    #[test]
    fn from_patch_fills_defaults() {
        let rec = Record::from_patch(
            CollectionId::new(),
            "abc",
            &patch("{\"a\":1}"),
            Timestamp::from_secs(10.0),
        );
        assert_eq!(rec.sortindex, 0);
        assert_eq!(rec.parentid, None);
        assert_eq!(rec.payload_size, 7);
        assert_eq!(rec.modified, Timestamp::from_secs(10.0));
    }

    #[test]
    fn apply_keeps_absent_fields() {
        let mut rec = Record::from_patch(
            CollectionId::new(),
            "abc",
            &RecordPatch {
                sortindex: Some(5),
                parentid: Some("p".into()),
                payload: Some("{}".into()),
                ..Default::default()
            },
            Timestamp::from_secs(10.0),
        );
        rec.apply(&patch("[1,2,3]"), Timestamp::from_secs(20.0));
        assert_eq!(rec.sortindex, 5);
        assert_eq!(rec.parentid.as_deref(), Some("p"));
        assert_eq!(rec.payload, "[1,2,3]");
        assert_eq!(rec.payload_size, 7);
        assert_eq!(rec.modified, Timestamp::from_secs(20.0));
    }

    #[test]
    fn empty_patch_only_touches_modified() {
        let mut rec = Record::from_patch(
            CollectionId::new(),
            "abc",
            &patch("{}"),
            Timestamp::from_secs(1.0),
        );
        let before = rec.clone();
        let empty = RecordPatch::default();
        assert!(empty.is_empty());
        rec.apply(&empty, Timestamp::from_secs(2.0));
        assert_eq!(rec.payload, before.payload);
        assert_eq!(rec.modified, Timestamp::from_secs(2.0));
    }

    #[test]
    fn view_omits_zero_and_empty_fields() {
        let rec = Record::from_patch(
            CollectionId::new(),
            "abc",
            &patch("{}"),
            Timestamp::from_secs(3.5),
        );
        let json = serde_json::to_value(rec.to_view()).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj["id"], "abc");
        assert_eq!(obj["payload"], "{}");
        assert_eq!(obj["payload_size"], 2);
        assert_eq!(obj["modified"], 3.5);
        assert!(!obj.contains_key("sortindex"));
        assert!(!obj.contains_key("parentid"));
        assert!(!obj.contains_key("predecessorid"));
    }
}
