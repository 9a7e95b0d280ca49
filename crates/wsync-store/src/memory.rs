use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;
use wsync_types::{Account, AccountId, CollectionId, Timestamp};

use crate::error::{StoreError, StoreResult};
use crate::filter::{narrow, Predicate};
use crate::record::{Collection, Record, RecordPatch};
use crate::traits::RecordStore;

#[derive(Default)]
struct Accounts {
    by_id: HashMap<AccountId, Account>,
    by_name: HashMap<String, AccountId>,
}

#[derive(Default)]
struct Collections {
    by_id: HashMap<CollectionId, Collection>,
    by_name: HashMap<(AccountId, String), CollectionId>,
}

type RecordTable = HashMap<CollectionId, BTreeMap<String, Record>>;

fn ids_matching(records: &BTreeMap<String, Record>, predicate: &Predicate) -> BTreeSet<String> {
    match predicate {
        // Point lookups avoid a full scan.
        Predicate::Id(id) => records
            .get_key_value(id.as_str())
            .map(|(k, _)| k.clone())
            .into_iter()
            .collect(),
        Predicate::Ids(ids) => ids
            .iter()
            .filter(|id| records.contains_key(id.as_str()))
            .cloned()
            .collect(),
        _ => records
            .values()
            .filter(|r| predicate.matches(r))
            .map(|r| r.id.clone())
            .collect(),
    }
}

fn lookup(collections: &Collections, key: &(AccountId, String)) -> Option<Collection> {
    collections
        .by_name
        .get(key)
        .and_then(|id| collections.by_id.get(id))
        .cloned()
}

/// In-memory, HashMap-based record store.
///
/// Intended for tests and embedding. State lives behind `RwLock`s; records
/// are cloned on read and write. Lock order is accounts, collections,
/// records.
///
/// [`inject_failures`](Self::inject_failures) makes the next `n` calls fail
/// with [`StoreError::Unavailable`], for exercising caller retry paths.
pub struct InMemoryRecordStore {
    accounts: RwLock<Accounts>,
    collections: RwLock<Collections>,
    records: RwLock<RecordTable>,
    pending_failures: AtomicUsize,
}

fn read<'a, T>(lock: &'a RwLock<T>, what: &str) -> StoreResult<RwLockReadGuard<'a, T>> {
    lock.read()
        .map_err(|e| StoreError::Poisoned(format!("{what}: {e}")))
}

fn write<'a, T>(lock: &'a RwLock<T>, what: &str) -> StoreResult<RwLockWriteGuard<'a, T>> {
    lock.write()
        .map_err(|e| StoreError::Poisoned(format!("{what}: {e}")))
}

impl InMemoryRecordStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            accounts: RwLock::new(Accounts::default()),
            collections: RwLock::new(Collections::default()),
            records: RwLock::new(HashMap::new()),
            pending_failures: AtomicUsize::new(0),
        }
    }

    /// Make the next `n` store calls fail with a transient error.
    pub fn inject_failures(&self, n: usize) {
        self.pending_failures.store(n, Ordering::SeqCst);
    }

    /// Total number of records across all collections.
    pub fn record_count(&self) -> usize {
        self.records
            .read()
            .map(|t| t.values().map(BTreeMap::len).sum())
            .unwrap_or(0)
    }

    /// Total number of collections across all accounts.
    pub fn collection_count(&self) -> usize {
        self.collections.read().map(|c| c.by_id.len()).unwrap_or(0)
    }

    fn check_available(&self) -> StoreResult<()> {
        let took = self
            .pending_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        match took {
            Ok(_) => Err(StoreError::Unavailable("injected failure".into())),
            Err(_) => Ok(()),
        }
    }

    fn with_collection<T>(
        &self,
        collection: &CollectionId,
        f: impl FnOnce(&BTreeMap<String, Record>) -> T,
    ) -> StoreResult<T> {
        let table = read(&self.records, "records")?;
        let records = table
            .get(collection)
            .ok_or(StoreError::CollectionNotFound(*collection))?;
        Ok(f(records))
    }
}

impl Default for InMemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordStore for InMemoryRecordStore {
    fn create_account(&self, user_name: &str) -> StoreResult<Account> {
        self.check_available()?;
        let mut accounts = write(&self.accounts, "accounts")?;
        if accounts.by_name.contains_key(user_name) {
            return Err(StoreError::AccountExists(user_name.to_string()));
        }
        let account = Account::new(user_name);
        accounts.by_name.insert(user_name.to_string(), account.id);
        accounts.by_id.insert(account.id, account.clone());
        Ok(account)
    }

    fn account(&self, id: &AccountId) -> StoreResult<Option<Account>> {
        self.check_available()?;
        Ok(read(&self.accounts, "accounts")?.by_id.get(id).cloned())
    }

    fn account_by_name(&self, user_name: &str) -> StoreResult<Option<Account>> {
        self.check_available()?;
        let accounts = read(&self.accounts, "accounts")?;
        Ok(accounts
            .by_name
            .get(user_name)
            .and_then(|id| accounts.by_id.get(id))
            .cloned())
    }

    fn get_or_create_collection(
        &self,
        account: &AccountId,
        name: &str,
    ) -> StoreResult<Collection> {
        self.check_available()?;
        let key = (*account, name.to_string());
        {
            let collections = read(&self.collections, "collections")?;
            if let Some(existing) = lookup(&collections, &key) {
                return Ok(existing);
            }
        }

        // Re-check under the write lock: another caller may have won the race.
        let mut collections = write(&self.collections, "collections")?;
        if let Some(existing) = lookup(&collections, &key) {
            return Ok(existing);
        }
        let collection = Collection::new(*account, name, Timestamp::now());
        write(&self.records, "records")?.insert(collection.id, BTreeMap::new());
        collections.by_name.insert(key, collection.id);
        collections.by_id.insert(collection.id, collection.clone());
        debug!(collection = %collection.id, name, "collection created");
        Ok(collection)
    }

    fn collection(&self, id: &CollectionId) -> StoreResult<Option<Collection>> {
        self.check_available()?;
        Ok(read(&self.collections, "collections")?.by_id.get(id).cloned())
    }

    fn collection_by_name(
        &self,
        account: &AccountId,
        name: &str,
    ) -> StoreResult<Option<Collection>> {
        self.check_available()?;
        let collections = read(&self.collections, "collections")?;
        Ok(lookup(&collections, &(*account, name.to_string())))
    }

    fn collections(&self, account: &AccountId) -> StoreResult<Vec<Collection>> {
        self.check_available()?;
        let collections = read(&self.collections, "collections")?;
        let mut owned: Vec<Collection> = collections
            .by_id
            .values()
            .filter(|c| c.account == *account)
            .cloned()
            .collect();
        owned.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(owned)
    }

    fn remove_collection(&self, id: &CollectionId) -> StoreResult<bool> {
        self.check_available()?;
        let mut collections = write(&self.collections, "collections")?;
        let Some(collection) = collections.by_id.remove(id) else {
            return Ok(false);
        };
        collections
            .by_name
            .remove(&(collection.account, collection.name.clone()));
        write(&self.records, "records")?.remove(id);
        Ok(true)
    }

    fn read_record(&self, collection: &CollectionId, id: &str) -> StoreResult<Option<Record>> {
        self.check_available()?;
        self.with_collection(collection, |records| records.get(id).cloned())
    }

    fn merge_record(
        &self,
        collection: &CollectionId,
        id: &str,
        patch: &RecordPatch,
        modified: Timestamp,
    ) -> StoreResult<Record> {
        self.check_available()?;
        let mut table = write(&self.records, "records")?;
        let records = table
            .get_mut(collection)
            .ok_or(StoreError::CollectionNotFound(*collection))?;
        let record = match records.get_mut(id) {
            Some(existing) => {
                existing.apply(patch, modified);
                existing.clone()
            }
            None => {
                let created = Record::from_patch(*collection, id, patch, modified);
                records.insert(id.to_string(), created.clone());
                created
            }
        };
        Ok(record)
    }

    fn matching_ids(
        &self,
        collection: &CollectionId,
        predicate: &Predicate,
    ) -> StoreResult<BTreeSet<String>> {
        self.check_available()?;
        self.with_collection(collection, |records| ids_matching(records, predicate))
    }

    fn select_records(
        &self,
        collection: &CollectionId,
        predicates: &[Predicate],
        per_filter_cap: Option<usize>,
    ) -> StoreResult<Vec<Record>> {
        self.check_available()?;
        // One read guard for the whole evaluation.
        self.with_collection(collection, |records| {
            if predicates.is_empty() {
                return records.values().cloned().collect();
            }
            let mut keys: Option<BTreeSet<String>> = None;
            for predicate in predicates {
                let narrowed = narrow(keys, ids_matching(records, predicate), per_filter_cap);
                if narrowed.is_empty() {
                    return Vec::new();
                }
                keys = Some(narrowed);
            }
            keys.unwrap_or_default()
                .into_iter()
                .filter_map(|id| records.get(&id).cloned())
                .collect()
        })
    }

    fn records(&self, collection: &CollectionId) -> StoreResult<Vec<Record>> {
        self.check_available()?;
        self.with_collection(collection, |records| records.values().cloned().collect())
    }

    fn read_records(&self, collection: &CollectionId, ids: &[String]) -> StoreResult<Vec<Record>> {
        self.check_available()?;
        self.with_collection(collection, |records| {
            ids.iter().filter_map(|id| records.get(id).cloned()).collect()
        })
    }

    fn delete_records(&self, collection: &CollectionId, ids: &[String]) -> StoreResult<usize> {
        self.check_available()?;
        let mut table = write(&self.records, "records")?;
        let records = table
            .get_mut(collection)
            .ok_or(StoreError::CollectionNotFound(*collection))?;
        Ok(ids.iter().filter(|id| records.remove(id.as_str()).is_some()).count())
    }

    fn count(&self, collection: &CollectionId) -> StoreResult<u64> {
        self.check_available()?;
        self.with_collection(collection, |records| records.len() as u64)
    }

    fn latest_modified(&self, collection: &CollectionId) -> StoreResult<Option<Timestamp>> {
        self.check_available()?;
        self.with_collection(collection, |records| records.values().map(|r| r.modified).max())
    }
}

impl std::fmt::Debug for InMemoryRecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryRecordStore")
            .field("collection_count", &self.collection_count())
            .field("record_count", &self.record_count())
            .finish()
    }
}
