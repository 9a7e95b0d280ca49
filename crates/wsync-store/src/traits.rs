use std::collections::BTreeSet;

use wsync_types::{Account, AccountId, CollectionId, Timestamp};

use crate::error::StoreResult;
use crate::filter::{narrow, Predicate};
use crate::record::{Collection, Record, RecordPatch};

/// Storage substrate for accounts, collections, and records.
///
/// All implementations must satisfy these invariants:
/// - `(account, name)` maps to at most one collection. `get_or_create_collection`
///   is an atomic get-or-insert: concurrent callers observe the same collection.
/// - `merge_record` is an atomic read-modify-write scoped to one
///   `(collection, id)` key. Last writer wins.
/// - Reads see every write committed before the read began.
/// - Collections exclusively own their records; removing a collection
///   removes whatever records remain in it.
/// - All backend failures are propagated, never silently ignored.
pub trait RecordStore: Send + Sync {
    // ---- Accounts ----

    /// Register an account. Fails with `AccountExists` if the user name is
    /// taken.
    fn create_account(&self, user_name: &str) -> StoreResult<Account>;

    /// Look up an account by id. Returns `Ok(None)` if unknown.
    fn account(&self, id: &AccountId) -> StoreResult<Option<Account>>;

    /// Look up an account by its unique user name.
    fn account_by_name(&self, user_name: &str) -> StoreResult<Option<Account>>;

    // ---- Collections ----

    /// Return the collection named `name` for `account`, creating it if it
    /// does not exist yet.
    fn get_or_create_collection(&self, account: &AccountId, name: &str)
        -> StoreResult<Collection>;

    /// Look up a collection by id.
    fn collection(&self, id: &CollectionId) -> StoreResult<Option<Collection>>;

    /// Look up a collection by owner and name without creating it.
    fn collection_by_name(&self, account: &AccountId, name: &str)
        -> StoreResult<Option<Collection>>;

    /// All collections owned by `account`, sorted by name.
    fn collections(&self, account: &AccountId) -> StoreResult<Vec<Collection>>;

    /// Remove a collection together with every record it owns, as one
    /// atomic step: on `Err` nothing has been removed. Returns `true` if the
    /// collection existed.
    fn remove_collection(&self, id: &CollectionId) -> StoreResult<bool>;

    // ---- Records ----

    /// Read one record. Returns `Ok(None)` if absent.
    fn read_record(&self, collection: &CollectionId, id: &str) -> StoreResult<Option<Record>>;

    /// Check whether a record exists.
    fn record_exists(&self, collection: &CollectionId, id: &str) -> StoreResult<bool> {
        Ok(self.read_record(collection, id)?.is_some())
    }

    /// Atomically create or update the record at `(collection, id)`.
    ///
    /// If absent, the record is built from `patch` with defaults; if present,
    /// only the fields present in `patch` are overwritten. `modified` is
    /// always set. Fails with `CollectionNotFound` if the collection is gone.
    fn merge_record(
        &self,
        collection: &CollectionId,
        id: &str,
        patch: &RecordPatch,
        modified: Timestamp,
    ) -> StoreResult<Record>;

    /// Ids of every record in the collection matching `predicate`, in id order.
    fn matching_ids(
        &self,
        collection: &CollectionId,
        predicate: &Predicate,
    ) -> StoreResult<BTreeSet<String>>;

    /// Records matching every predicate, evaluated against one consistent
    /// view of the collection. With no predicates, every record.
    ///
    /// Each predicate selects its key set independently; the sets are then
    /// intersected. `per_filter_cap` truncates each key set (in id order)
    /// before intersection.
    ///
    /// The default implementation composes `matching_ids` and
    /// `read_records` and re-checks the fetched records, so a record changed
    /// in between never appears with values that fail a predicate. Backends
    /// that can hold one snapshot for the whole evaluation should override.
    fn select_records(
        &self,
        collection: &CollectionId,
        predicates: &[Predicate],
        per_filter_cap: Option<usize>,
    ) -> StoreResult<Vec<Record>> {
        if predicates.is_empty() {
            return self.records(collection);
        }
        let mut keys: Option<BTreeSet<String>> = None;
        for predicate in predicates {
            let matched = self.matching_ids(collection, predicate)?;
            let narrowed = narrow(keys, matched, per_filter_cap);
            if narrowed.is_empty() {
                return Ok(Vec::new());
            }
            keys = Some(narrowed);
        }
        let ids: Vec<String> = keys.unwrap_or_default().into_iter().collect();
        let mut fetched = self.read_records(collection, &ids)?;
        fetched.retain(|record| predicates.iter().all(|p| p.matches(record)));
        Ok(fetched)
    }

    /// Every record in the collection, in id order.
    fn records(&self, collection: &CollectionId) -> StoreResult<Vec<Record>>;

    /// Read several records; missing ids are skipped.
    ///
    /// Default implementation calls `read_record()` for each id. Backends may
    /// override for fewer round-trips.
    fn read_records(&self, collection: &CollectionId, ids: &[String]) -> StoreResult<Vec<Record>> {
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(record) = self.read_record(collection, id)? {
                out.push(record);
            }
        }
        Ok(out)
    }

    /// Delete the given records. Returns how many existed.
    fn delete_records(&self, collection: &CollectionId, ids: &[String]) -> StoreResult<usize>;

    /// Number of records in the collection.
    fn count(&self, collection: &CollectionId) -> StoreResult<u64> {
        Ok(self.records(collection)?.len() as u64)
    }

    /// Latest `modified` across the collection, `None` if it is empty.
    fn latest_modified(&self, collection: &CollectionId) -> StoreResult<Option<Timestamp>> {
        Ok(self.records(collection)?.iter().map(|r| r.modified).max())
    }
}
