use std::sync::Arc;

use tracing::{debug, warn};
use wsync_gate::{RecordCandidate, RecordValidator, ValidationError};
use wsync_store::{Collection, RecordPatch, RecordStore};
use wsync_types::is_valid_collection_name;

use crate::clock::Clock;
use crate::error::EngineResult;
use crate::registry::CollectionRegistry;
use crate::request::{AccountRef, BatchOutcome, CollectionTarget, WriteOutcome, WriteRequest};

/// Validates writes and merges accepted ones into storage.
///
/// Each call performs at most one logical write: the record is either fully
/// updated or left exactly as it was. There is no atomicity across calls.
pub struct UpsertEngine {
    store: Arc<dyn RecordStore>,
    registry: Arc<CollectionRegistry>,
    validator: RecordValidator,
    clock: Arc<dyn Clock>,
}

impl UpsertEngine {
    pub fn new(
        store: Arc<dyn RecordStore>,
        registry: Arc<CollectionRegistry>,
        validator: RecordValidator,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            registry,
            validator,
            clock,
        }
    }

    pub fn validator(&self) -> &RecordValidator {
        &self.validator
    }

    /// Validate `request` and, if it passes, create or update the record.
    ///
    /// Rejections come back as `Ok` with a non-empty error list; `Err` means
    /// the store failed.
    pub fn insert_or_update(&self, request: &WriteRequest) -> EngineResult<WriteOutcome> {
        let collection = self.resolve(request.target.as_ref())?;
        let modified = self.clock.now();

        let candidate = RecordCandidate {
            id: request.id.clone(),
            collection,
            modified: Some(modified.as_secs()),
            sortindex: request.sortindex.clone(),
            parentid: request.parentid.clone(),
            predecessorid: request.predecessorid.clone(),
            payload: request.payload.clone(),
        };

        let errors = self.validator.validate(&candidate, self.store.as_ref())?;
        if !errors.is_empty() {
            warn!(id = ?candidate.id, ?errors, "write rejected");
            return Ok(WriteOutcome::rejected(errors));
        }

        let (collection, id, patch) = match into_parts(candidate) {
            Ok(parts) => parts,
            Err(error) => return Ok(WriteOutcome::rejected(vec![error])),
        };

        let record = self.store.merge_record(&collection.id, &id, &patch, modified)?;
        debug!(
            collection = %collection.id,
            id = %record.id,
            modified = %record.modified,
            payload_size = record.payload_size,
            "record stored"
        );
        Ok(WriteOutcome::accepted(record))
    }

    /// Apply several writes in order. Each write is independently atomic;
    /// a rejected write does not affect the others.
    pub fn insert_or_update_batch(&self, requests: &[WriteRequest]) -> EngineResult<BatchOutcome> {
        let mut batch = BatchOutcome::default();
        for request in requests {
            let outcome = self.insert_or_update(request)?;
            batch.record(request.id.as_deref(), outcome);
        }
        debug!(
            success = batch.success.len(),
            failed = batch.failed.len(),
            "batch applied"
        );
        Ok(batch)
    }

    /// Find the target collection, creating named collections on first use.
    /// Unknown accounts, unknown collection ids, and over-long names resolve
    /// to `None`, which validation reports as an invalid collection.
    fn resolve(&self, target: Option<&CollectionTarget>) -> EngineResult<Option<Collection>> {
        let Some(target) = target else {
            return Ok(None);
        };
        match target {
            CollectionTarget::Collection(id) => Ok(self.store.collection(id)?),
            CollectionTarget::Named { account, name } => {
                if !is_valid_collection_name(name) {
                    return Ok(None);
                }
                let account = match account {
                    AccountRef::Id(id) => self.store.account(id)?,
                    AccountRef::UserName(user_name) => self.store.account_by_name(user_name)?,
                };
                match account {
                    Some(account) => Ok(Some(self.registry.get_or_create(&account.id, name)?)),
                    None => Ok(None),
                }
            }
        }
    }
}

/// Split a validated candidate into its key and the typed patch to merge.
///
/// The default rules guarantee every branch here succeeds; a custom
/// pipeline that lets a malformed candidate through is still rejected.
fn into_parts(
    candidate: RecordCandidate,
) -> Result<(Collection, String, RecordPatch), ValidationError> {
    let collection = candidate.collection.ok_or(ValidationError::InvalidCollection)?;
    let id = candidate.id.ok_or(ValidationError::InvalidId)?;
    let sortindex = match candidate.sortindex {
        Some(value) => Some(value.as_i64().ok_or(ValidationError::InvalidSortIndex)?),
        None => None,
    };
    let patch = RecordPatch {
        sortindex,
        parentid: candidate.parentid,
        predecessorid: candidate.predecessorid,
        payload: candidate.payload,
    };
    Ok((collection, id, patch))
}

impl std::fmt::Debug for UpsertEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpsertEngine")
            .field("validator", &self.validator)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use wsync_gate::ValidatorConfig;
    use wsync_store::InMemoryRecordStore;
    use wsync_types::{AccountId, Timestamp};

    fn setup() -> (Arc<InMemoryRecordStore>, UpsertEngine, AccountId) {
        let store = Arc::new(InMemoryRecordStore::new());
        let account = store.create_account("alice").unwrap().id;
        let registry = Arc::new(CollectionRegistry::new(store.clone(), 3));
        let clock = Arc::new(ManualClock::new(Timestamp::from_secs(1_000.0), 1.0));
        let engine = UpsertEngine::new(store.clone(), registry, RecordValidator::default(), clock);
        (store, engine, account)
    }

    #[test]
    fn creates_collection_and_record() {
        let (store, engine, account) = setup();
        let req = WriteRequest::named(account, "custom", "r1").with_payload("{}");
        let outcome = engine.insert_or_update(&req).unwrap();
        assert!(outcome.is_accepted());
        let record = outcome.record.unwrap();
        assert_eq!(record.modified, Timestamp::from_secs(1_000.0));
        assert_eq!(record.payload_size, 2);
        assert_eq!(store.collection_count(), 1);
    }

    #[test]
    fn resolves_by_user_name_and_collection_id() {
        let (store, engine, account) = setup();
        let first = engine
            .insert_or_update(&WriteRequest::named("alice", "tabs", "t1").with_payload("{}"))
            .unwrap()
            .record
            .unwrap();
        let collection = store.collection(&first.collection).unwrap().unwrap();
        assert_eq!(collection.account, account);

        let second = engine
            .insert_or_update(&WriteRequest::in_collection(collection.id, "t2").with_payload("[]"))
            .unwrap();
        assert!(second.is_accepted());
        assert_eq!(store.count(&collection.id).unwrap(), 2);
    }

    #[test]
    fn unknown_account_is_invalid_collection() {
        let (store, engine, _) = setup();
        let outcome = engine
            .insert_or_update(&WriteRequest::named("mallory", "tabs", "t1").with_payload("{}"))
            .unwrap();
        assert_eq!(outcome.errors, vec![ValidationError::InvalidCollection]);
        assert_eq!(store.collection_count(), 0);
    }

    #[test]
    fn over_long_collection_name_is_not_created() {
        let (store, engine, account) = setup();
        let req = WriteRequest::named(account, "n".repeat(65), "r1").with_payload("{}");
        let outcome = engine.insert_or_update(&req).unwrap();
        assert_eq!(outcome.errors, vec![ValidationError::InvalidCollection]);
        assert_eq!(store.collection_count(), 0);
    }

    #[test]
    fn rejected_write_leaves_record_unchanged() {
        let (store, engine, account) = setup();
        let stored = engine
            .insert_or_update(
                &WriteRequest::named(account, "tabs", "t1")
                    .with_sortindex(7)
                    .with_payload("{\"v\":1}"),
            )
            .unwrap()
            .record
            .unwrap();

        let bad = WriteRequest::named(account, "tabs", "t1")
            .with_sortindex(99)
            .with_payload("{broken");
        let outcome = engine.insert_or_update(&bad).unwrap();
        assert_eq!(outcome.errors, vec![ValidationError::PayloadNotJson]);
        assert!(outcome.record.is_none());

        let current = store.read_record(&stored.collection, "t1").unwrap().unwrap();
        assert_eq!(current, stored);
    }

    #[test]
    fn update_merges_only_sent_fields() {
        let (_, engine, account) = setup();
        engine
            .insert_or_update(&WriteRequest::named(account, "bookmarks", "root").with_payload("{}"))
            .unwrap();
        engine
            .insert_or_update(
                &WriteRequest::named(account, "bookmarks", "b1")
                    .with_sortindex(3)
                    .with_parentid("root")
                    .with_payload("{\"v\":1}"),
            )
            .unwrap();

        let updated = engine
            .insert_or_update(&WriteRequest::named(account, "bookmarks", "b1").with_payload("{\"v\":2}"))
            .unwrap()
            .record
            .unwrap();
        assert_eq!(updated.sortindex, 3);
        assert_eq!(updated.parentid.as_deref(), Some("root"));
        assert_eq!(updated.payload, "{\"v\":2}");
        assert_eq!(updated.modified, Timestamp::from_secs(1_002.0));
    }

    #[test]
    fn update_without_payload_touches_modified_only() {
        let (_, engine, account) = setup();
        engine
            .insert_or_update(&WriteRequest::named(account, "tabs", "t1").with_payload("{}"))
            .unwrap();
        let touched = engine
            .insert_or_update(&WriteRequest::named(account, "tabs", "t1").with_sortindex(4))
            .unwrap()
            .record
            .unwrap();
        assert_eq!(touched.payload, "{}");
        assert_eq!(touched.sortindex, 4);
    }

    #[test]
    fn payload_limit_comes_from_validator_config() {
        let store = Arc::new(InMemoryRecordStore::new());
        let account = store.create_account("alice").unwrap().id;
        let registry = Arc::new(CollectionRegistry::new(store.clone(), 3));
        let validator = RecordValidator::with_default_rules(ValidatorConfig {
            max_payload_bytes: 8,
        });
        let engine = UpsertEngine::new(store, registry, validator, Arc::new(crate::clock::SystemClock));
        let outcome = engine
            .insert_or_update(&WriteRequest::named(account, "tabs", "t1").with_payload("[1,2,3,4,5]"))
            .unwrap();
        assert_eq!(outcome.errors, vec![ValidationError::PayloadTooLarge]);
    }

    #[test]
    fn batch_reports_per_id() {
        let (_, engine, account) = setup();
        let batch = engine
            .insert_or_update_batch(&[
                WriteRequest::named(account, "tabs", "ok1").with_payload("{}"),
                WriteRequest::named(account, "tabs", "bad/id").with_payload("{}"),
                WriteRequest::named(account, "tabs", "ok2").with_payload("{}"),
            ])
            .unwrap();
        assert_eq!(batch.success, vec!["ok1", "ok2"]);
        assert_eq!(batch.failed["bad/id"], vec![ValidationError::InvalidId]);
        // ok1 at 1000, bad/id consumes 1001, ok2 at 1002.
        assert_eq!(batch.modified, Some(Timestamp::from_secs(1_002.0)));
    }

    #[test]
    fn store_failure_propagates() {
        let (store, engine, account) = setup();
        store.inject_failures(1);
        let err = engine
            .insert_or_update(&WriteRequest::named(account, "tabs", "t1").with_payload("{}"))
            .unwrap_err();
        assert!(err.is_transient());
    }

    #[test]
    fn into_parts_rejects_malformed_candidates() {
        let err = into_parts(RecordCandidate::default()).unwrap_err();
        assert_eq!(err, ValidationError::InvalidCollection);
    }
}
