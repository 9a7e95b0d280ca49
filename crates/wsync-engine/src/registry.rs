//! Per-account collection registry.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{info, warn};
use wsync_store::{Collection, RecordStore, StoreResult};
use wsync_types::{AccountId, Timestamp};

/// Collection names every account has, whether or not it ever wrote to them.
pub const BUILTIN_COLLECTIONS: [&str; 10] = [
    "clients",
    "crypto",
    "forms",
    "history",
    "keys",
    "meta",
    "bookmarks",
    "prefs",
    "tabs",
    "passwords",
];

/// Returns `true` if `name` is one of the built-in collection names.
pub fn is_builtin(name: &str) -> bool {
    BUILTIN_COLLECTIONS.contains(&name)
}

/// Manages named collections per account and aggregates their statistics.
pub struct CollectionRegistry {
    store: Arc<dyn RecordStore>,
    delete_attempts: u32,
}

impl CollectionRegistry {
    pub fn new(store: Arc<dyn RecordStore>, delete_attempts: u32) -> Self {
        Self {
            store,
            delete_attempts: delete_attempts.max(1),
        }
    }

    /// Return the collection `name` for `account`, creating it on first use.
    /// Concurrent callers always get the same collection.
    pub fn get_or_create(&self, account: &AccountId, name: &str) -> StoreResult<Collection> {
        self.store.get_or_create_collection(account, name)
    }

    /// Look up a collection without creating it.
    pub fn get(&self, account: &AccountId, name: &str) -> StoreResult<Option<Collection>> {
        self.store.collection_by_name(account, name)
    }

    /// All collections `account` has materialized, sorted by name.
    pub fn list(&self, account: &AccountId) -> StoreResult<Vec<Collection>> {
        self.store.collections(account)
    }

    /// Delete a collection and every record it owns.
    ///
    /// The cascade is the store's single atomic `remove_collection`, so a
    /// failed call leaves the collection and its records untouched.
    /// Transient failures are retried up to the configured attempt count;
    /// the last failure is returned. Returns `true` if the collection existed.
    pub fn delete(&self, collection: &Collection) -> StoreResult<bool> {
        let mut attempt = 1;
        loop {
            match self.store.remove_collection(&collection.id) {
                Ok(existed) => {
                    info!(collection = %collection.id, name = %collection.name, attempt, existed, "collection deleted");
                    return Ok(existed);
                }
                Err(e) if e.is_transient() && attempt < self.delete_attempts => {
                    warn!(collection = %collection.id, attempt, error = %e, "collection delete failed; retrying");
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Last-modified time per collection name. Built-in names are always
    /// present, with [`Timestamp::ZERO`] when they hold no records.
    pub fn get_timestamps(&self, account: &AccountId) -> StoreResult<BTreeMap<String, Timestamp>> {
        let mut out: BTreeMap<String, Timestamp> = BUILTIN_COLLECTIONS
            .iter()
            .map(|name| (name.to_string(), Timestamp::ZERO))
            .collect();
        for collection in self.store.collections(account)? {
            let latest = self.store.latest_modified(&collection.id)?;
            out.insert(collection.name, latest.unwrap_or(Timestamp::ZERO));
        }
        Ok(out)
    }

    /// Record count per collection name. Built-in names are always present.
    pub fn get_counts(&self, account: &AccountId) -> StoreResult<BTreeMap<String, u64>> {
        let mut out: BTreeMap<String, u64> = BUILTIN_COLLECTIONS
            .iter()
            .map(|name| (name.to_string(), 0))
            .collect();
        for collection in self.store.collections(account)? {
            let count = self.store.count(&collection.id)?;
            out.insert(collection.name, count);
        }
        Ok(out)
    }
}

impl std::fmt::Debug for CollectionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectionRegistry")
            .field("delete_attempts", &self.delete_attempts)
            .finish()
    }
}
