use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::info;
use wsync_gate::{RecordCandidate, RecordValidator, ValidationError};
use wsync_store::{Collection, InMemoryRecordStore, RecordStore};
use wsync_types::{Account, AccountId, CollectionId, Timestamp};

use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::query::{QueryEngine, QueryOptions, Retrieval};
use crate::registry::CollectionRegistry;
use crate::request::{BatchOutcome, WriteOutcome, WriteRequest};
use crate::upsert::UpsertEngine;

/// The sync storage core over one record store.
///
/// `SyncEngine` is `Send + Sync`; share it behind an `Arc` to serve
/// concurrent requests.
pub struct SyncEngine {
    config: EngineConfig,
    store: Arc<dyn RecordStore>,
    registry: Arc<CollectionRegistry>,
    upsert: UpsertEngine,
    query: QueryEngine,
}

impl SyncEngine {
    /// Create an engine over `store` using the system clock.
    pub fn new(store: Arc<dyn RecordStore>, config: EngineConfig) -> EngineResult<Self> {
        Self::with_clock(store, config, Arc::new(SystemClock))
    }

    /// Create an engine with an explicit timestamp source.
    pub fn with_clock(
        store: Arc<dyn RecordStore>,
        config: EngineConfig,
        clock: Arc<dyn Clock>,
    ) -> EngineResult<Self> {
        config.validate()?;
        info!(
            max_payload_bytes = config.max_payload_bytes,
            default_limit = config.default_limit,
            cap_filters = config.cap_filters_before_intersection,
            "sync engine ready"
        );
        Ok(Self::assemble(store, config, clock))
    }

    /// An engine over a fresh in-memory store with default settings.
    pub fn in_memory() -> Self {
        Self::assemble(
            Arc::new(InMemoryRecordStore::new()),
            EngineConfig::default(),
            Arc::new(SystemClock),
        )
    }

    fn assemble(store: Arc<dyn RecordStore>, config: EngineConfig, clock: Arc<dyn Clock>) -> Self {
        let registry = Arc::new(CollectionRegistry::new(store.clone(), config.delete_attempts));
        let validator = RecordValidator::with_default_rules(config.validator_config());
        let upsert = UpsertEngine::new(store.clone(), registry.clone(), validator, clock);
        let query = QueryEngine::new(
            store.clone(),
            config.default_limit,
            config.cap_filters_before_intersection,
        );
        Self {
            config,
            store,
            registry,
            upsert,
            query,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    pub fn registry(&self) -> &CollectionRegistry {
        &self.registry
    }

    // -----------------------------------------------------------------------
    // Accounts and collections
    // -----------------------------------------------------------------------

    pub fn create_account(&self, user_name: &str) -> EngineResult<Account> {
        Ok(self.store.create_account(user_name)?)
    }

    pub fn account_by_name(&self, user_name: &str) -> EngineResult<Account> {
        self.store
            .account_by_name(user_name)?
            .ok_or_else(|| EngineError::AccountNotFound(user_name.to_string()))
    }

    /// The collection `name` of `account`, created on first use.
    pub fn collection(&self, account: &AccountId, name: &str) -> EngineResult<Collection> {
        Ok(self.registry.get_or_create(account, name)?)
    }

    /// Look up a collection by id.
    pub fn find_collection(&self, id: &CollectionId) -> EngineResult<Option<Collection>> {
        Ok(self.store.collection(id)?)
    }

    /// Delete a collection and all of its records.
    pub fn delete_collection(&self, collection: &Collection) -> EngineResult<bool> {
        Ok(self.registry.delete(collection)?)
    }

    pub fn collection_timestamps(&self, account: &AccountId) -> EngineResult<BTreeMap<String, Timestamp>> {
        Ok(self.registry.get_timestamps(account)?)
    }

    pub fn collection_counts(&self, account: &AccountId) -> EngineResult<BTreeMap<String, u64>> {
        Ok(self.registry.get_counts(account)?)
    }

    // -----------------------------------------------------------------------
    // Records
    // -----------------------------------------------------------------------

    pub fn insert_or_update(&self, request: &WriteRequest) -> EngineResult<WriteOutcome> {
        self.upsert.insert_or_update(request)
    }

    pub fn insert_or_update_batch(&self, requests: &[WriteRequest]) -> EngineResult<BatchOutcome> {
        self.upsert.insert_or_update_batch(requests)
    }

    /// Run the record validator without writing anything.
    pub fn validate(&self, candidate: &RecordCandidate) -> EngineResult<Vec<ValidationError>> {
        Ok(self.upsert.validator().validate(candidate, self.store.as_ref())?)
    }

    pub fn retrieve(&self, collection: &Collection, options: &QueryOptions) -> EngineResult<Retrieval> {
        self.query.retrieve(collection, options)
    }
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("config", &self.config)
            .field("upsert", &self.upsert)
            .field("query", &self.query)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::query::{RetrievedItem, SortOrder};
    use crate::registry::BUILTIN_COLLECTIONS;
    use wsync_gate::DEFAULT_MAX_PAYLOAD_BYTES;
    use wsync_store::Record;

    fn engine() -> (SyncEngine, Account) {
        let store: Arc<dyn RecordStore> = Arc::new(InMemoryRecordStore::new());
        let clock = Arc::new(ManualClock::new(Timestamp::from_secs(1_700_000_000.0), 0.01));
        let engine = SyncEngine::with_clock(store, EngineConfig::default(), clock).unwrap();
        let account = engine.create_account("alice").unwrap();
        (engine, account)
    }

    fn write(engine: &SyncEngine, request: WriteRequest) -> WriteOutcome {
        engine.insert_or_update(&request).unwrap()
    }

    fn string_payload(total_bytes: usize) -> String {
        format!("\"{}\"", "a".repeat(total_bytes - 2))
    }

    // -----------------------------------------------------------------------
    // Construction
    // -----------------------------------------------------------------------

    #[test]
    fn rejects_invalid_config() {
        let store: Arc<dyn RecordStore> = Arc::new(InMemoryRecordStore::new());
        let config = EngineConfig {
            default_limit: 0,
            ..Default::default()
        };
        assert!(matches!(SyncEngine::new(store, config), Err(EngineError::Config(_))));
    }

    #[test]
    fn in_memory_uses_defaults() {
        let engine = SyncEngine::in_memory();
        assert_eq!(engine.config(), &EngineConfig::default());
        assert!(engine.account_by_name("nobody").is_err());
    }

    #[test]
    fn engine_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SyncEngine>();
    }

    // -----------------------------------------------------------------------
    // Write then read
    // -----------------------------------------------------------------------

    #[test]
    fn write_then_read_round_trip() {
        let (engine, account) = engine();
        write(&engine, WriteRequest::named(account.id, "bookmarks", "root").with_payload("{}"));
        let stored = write(
            &engine,
            WriteRequest::named(account.id, "bookmarks", "b1")
                .with_sortindex(42)
                .with_parentid("root")
                .with_predecessorid("root")
                .with_payload("{\"title\":\"x\"}"),
        )
        .record
        .unwrap();

        let bookmarks = engine.collection(&account.id, "bookmarks").unwrap();
        let items: Vec<RetrievedItem> = engine
            .retrieve(&bookmarks, &QueryOptions::new().with_id("b1").full())
            .unwrap()
            .collect();
        assert_eq!(items, vec![RetrievedItem::Full(stored.to_view())]);

        let RetrievedItem::Full(view) = &items[0] else {
            panic!("expected a full record");
        };
        assert_eq!(view.sortindex, Some(42));
        assert_eq!(view.parentid.as_deref(), Some("root"));
        assert_eq!(view.predecessorid.as_deref(), Some("root"));
        assert_eq!(view.payload.as_deref(), Some("{\"title\":\"x\"}"));
        assert_eq!(view.payload_size, Some(13));
    }

    #[test]
    fn rewriting_same_record_only_changes_modified() {
        let (engine, account) = engine();
        let request = WriteRequest::named(account.id, "prefs", "p1")
            .with_sortindex(1)
            .with_payload("{\"a\":1}");
        let first = write(&engine, request.clone()).record.unwrap();
        let second = write(&engine, request).record.unwrap();
        assert_eq!(first.id, second.id);
        assert!(second.modified > first.modified);
        assert_eq!(
            Record { modified: first.modified, ..second.clone() },
            first
        );
    }

    #[test]
    fn payload_at_limit_is_accepted() {
        let (engine, account) = engine();
        let outcome = write(
            &engine,
            WriteRequest::named(account.id, "forms", "f1").with_payload(string_payload(DEFAULT_MAX_PAYLOAD_BYTES)),
        );
        assert!(outcome.is_accepted());
        assert_eq!(outcome.record.unwrap().payload_size, DEFAULT_MAX_PAYLOAD_BYTES as u64);
    }

    #[test]
    fn payload_over_limit_is_rejected() {
        let (engine, account) = engine();
        let outcome = write(
            &engine,
            WriteRequest::named(account.id, "forms", "f1")
                .with_payload(string_payload(DEFAULT_MAX_PAYLOAD_BYTES + 1)),
        );
        assert_eq!(outcome.reasons(), vec!["payload too large"]);
    }

    #[test]
    fn parentid_must_exist_in_same_collection() {
        let (engine, account) = engine();
        write(&engine, WriteRequest::named(account.id, "tabs", "elsewhere").with_payload("{}"));

        let outcome = write(
            &engine,
            WriteRequest::named(account.id, "bookmarks", "b1")
                .with_parentid("elsewhere")
                .with_payload("{}"),
        );
        assert_eq!(outcome.reasons(), vec!["invalid parentid"]);

        let outcome = write(
            &engine,
            WriteRequest::named(account.id, "bookmarks", "b1")
                .with_predecessorid("missing")
                .with_payload("{}"),
        );
        assert_eq!(outcome.reasons(), vec!["invalid predecessorid"]);
    }

    #[test]
    fn rejection_reports_every_reason() {
        let (engine, account) = engine();
        let outcome = write(
            &engine,
            WriteRequest::named(account.id, "bookmarks", "a/b").with_sortindex(1_000_000_000),
        );
        assert_eq!(
            outcome.errors,
            vec![
                ValidationError::InvalidId,
                ValidationError::InvalidSortIndex,
                ValidationError::MissingPayload,
            ]
        );
    }

    #[test]
    fn rejected_update_keeps_prior_record() {
        let (engine, account) = engine();
        let stored = write(
            &engine,
            WriteRequest::named(account.id, "history", "h1")
                .with_sortindex(5)
                .with_payload("{\"v\":1}"),
        )
        .record
        .unwrap();

        let outcome = write(
            &engine,
            WriteRequest::named(account.id, "history", "h1")
                .with_sortindex(6)
                .with_payload("not json"),
        );
        assert!(!outcome.is_accepted());

        let history = engine.collection(&account.id, "history").unwrap();
        let items: Vec<RetrievedItem> = engine
            .retrieve(&history, &QueryOptions::new().full())
            .unwrap()
            .collect();
        assert_eq!(items, vec![RetrievedItem::Full(stored.to_view())]);
    }

    #[test]
    fn from_json_request_end_to_end() {
        let (engine, _) = engine();
        let request = WriteRequest::from_json(&serde_json::json!({
            "user_name": "alice",
            "collection_name": "clients",
            "id": "c1",
            "sortindex": "high",
            "payload": "{}",
        }))
        .unwrap();
        let outcome = engine.insert_or_update(&request).unwrap();
        assert_eq!(outcome.reasons(), vec!["invalid sortindex"]);
    }

    #[test]
    fn newest_is_strictly_decreasing() {
        let (engine, account) = engine();
        for id in ["a", "b", "c", "d"] {
            write(&engine, WriteRequest::named(account.id, "history", id).with_payload("{}"));
        }
        let history = engine.collection(&account.id, "history").unwrap();
        let items: Vec<RetrievedItem> = engine
            .retrieve(&history, &QueryOptions::new().full().with_sort(SortOrder::Newest))
            .unwrap()
            .collect();
        let stamps: Vec<Timestamp> = items
            .iter()
            .filter_map(|item| match item {
                RetrievedItem::Full(view) => view.modified,
                RetrievedItem::Id(_) => None,
            })
            .collect();
        assert_eq!(stamps.len(), 4);
        assert!(stamps.windows(2).all(|w| w[0] > w[1]));
    }

    #[test]
    fn validate_does_not_write() {
        let (engine, account) = engine();
        let tabs = engine.collection(&account.id, "tabs").unwrap();
        let candidate = RecordCandidate::new("t1", tabs.clone())
            .with_modified(10.0)
            .with_payload("{}");
        assert!(engine.validate(&candidate).unwrap().is_empty());
        assert_eq!(engine.store().count(&tabs.id).unwrap(), 0);
    }

    // -----------------------------------------------------------------------
    // Collections
    // -----------------------------------------------------------------------

    #[test]
    fn builtin_stats_without_writes() {
        let (engine, account) = engine();
        let counts = engine.collection_counts(&account.id).unwrap();
        let stamps = engine.collection_timestamps(&account.id).unwrap();
        for name in BUILTIN_COLLECTIONS {
            assert_eq!(counts[name], 0);
            assert_eq!(stamps[name], Timestamp::ZERO);
        }
    }

    #[test]
    fn delete_collection_cascades() {
        let (engine, account) = engine();
        let stored = write(&engine, WriteRequest::named(account.id, "custom", "x").with_payload("{}"))
            .record
            .unwrap();
        let custom = engine.find_collection(&stored.collection).unwrap().unwrap();
        assert_eq!(engine.collection_counts(&account.id).unwrap()["custom"], 1);

        assert!(engine.delete_collection(&custom).unwrap());
        assert!(engine.find_collection(&custom.id).unwrap().is_none());
        assert!(!engine.collection_counts(&account.id).unwrap().contains_key("custom"));
    }

    #[test]
    fn concurrent_writes_share_one_collection() {
        let (engine, account) = engine();
        let engine = Arc::new(engine);
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let engine = engine.clone();
                let account = account.id;
                std::thread::spawn(move || {
                    let request = WriteRequest::named(account, "shared", format!("r{i}")).with_payload("{}");
                    engine.insert_or_update(&request).unwrap().is_accepted()
                })
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap());
        }
        assert_eq!(engine.registry().list(&account.id).unwrap().len(), 1);
        assert_eq!(engine.collection_counts(&account.id).unwrap()["shared"], 8);
    }

    #[test]
    fn concurrent_writes_to_one_id_keep_a_single_write() {
        let (engine, account) = engine();
        let engine = Arc::new(engine);
        let payload_for = |i: i64| format!("{{\"writer\":{i},\"pad\":\"{}\"}}", "x".repeat(i as usize * 3));
        let handles: Vec<_> = (0..8i64)
            .map(|i| {
                let engine = engine.clone();
                let account = account.id;
                let payload = payload_for(i);
                std::thread::spawn(move || {
                    let request = WriteRequest::named(account, "tabs", "shared")
                        .with_sortindex(i)
                        .with_payload(payload);
                    engine.insert_or_update(&request).unwrap().is_accepted()
                })
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap());
        }

        let tabs = engine.collection(&account.id, "tabs").unwrap();
        let records = engine.store().records(&tabs.id).unwrap();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.payload, payload_for(record.sortindex));
        assert_eq!(record.payload_size, record.payload.len() as u64);
    }
}
