//! The record store: create, find, query, update, increment, destroy.

use std::sync::Arc;

use bytes::Bytes;
use common::{DelayedStorage, Storage};
use futures::future::join_all;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::codec::StoredValue;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::identity::{IdGenerator, SequentialIdGenerator};
use crate::index::KeyIndex;
use crate::model::Record;
use crate::query::{Filter, Query};

/// A field-level increment applied through [`RecordStore::increment`].
#[derive(Debug, Clone)]
pub struct Increment {
    /// The numeric attribute to increase.
    pub attribute: String,
    /// Amount added to the attribute (default 0 when the attribute is unset).
    pub amount: i64,
    /// When set, an absent target record is not an error; the call returns
    /// the record's own serialized form unchanged.
    pub ignore_failures: bool,
}

impl Increment {
    /// Creates an increment of `amount` on `attribute`.
    pub fn new(attribute: impl Into<String>, amount: i64) -> Self {
        Self {
            attribute: attribute.into(),
            amount,
            ignore_failures: false,
        }
    }

    /// Suppresses the not-found error for absent target records.
    pub fn ignoring_failures(mut self) -> Self {
        self.ignore_failures = true;
        self
    }
}

/// Storage-backed store for one collection of records.
///
/// The store orchestrates the key-value backend, the per-collection
/// [`KeyIndex`], and the [`Query`] engine. Multi-record reads load every
/// indexed key and evaluate the query in memory; there are no real index
/// structures.
///
/// # Concurrency
///
/// One store instance assumes a single logical task: read-modify-write
/// operations (`update`, `increment`) take no lock around the storage
/// round-trip, so interleaving them against the same key from concurrent
/// tasks can lose writes.
pub struct RecordStore {
    name: String,
    indexed_fields: Vec<String>,
    storage: Arc<dyn Storage>,
    ids: Arc<dyn IdGenerator>,
    index: Mutex<KeyIndex>,
}

impl RecordStore {
    /// Opens a store for the collection described by `config`, loading its
    /// persisted key index. Identities come from a [`SequentialIdGenerator`]
    /// owned by this instance.
    pub async fn open(storage: Arc<dyn Storage>, config: Config) -> Result<Self> {
        Self::open_with_generator(storage, config, Arc::new(SequentialIdGenerator::new())).await
    }

    /// Opens a store with a caller-supplied identity generator.
    pub async fn open_with_generator(
        storage: Arc<dyn Storage>,
        config: Config,
        ids: Arc<dyn IdGenerator>,
    ) -> Result<Self> {
        let storage: Arc<dyn Storage> = match config.delay {
            Some(delay) => Arc::new(DelayedStorage::new(storage, delay)),
            None => storage,
        };

        let index = match storage.get(Bytes::from(config.name.clone())).await? {
            Some(bytes) => KeyIndex::decode(&bytes)?,
            None => KeyIndex::new(),
        };

        Ok(Self {
            name: config.name,
            indexed_fields: config.indexed_fields,
            storage,
            ids,
            index: Mutex::new(index),
        })
    }

    /// Returns the collection name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Exposes the raw storage backend.
    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// Creates a record, assigning an identity if it has none.
    ///
    /// The serialized record is written under its key, the key is appended
    /// to the key index, and the index is persisted. Returns the stored
    /// value.
    pub async fn create(&self, record: &mut Record) -> Result<Value> {
        if record.is_new() {
            let id = self.ids.next_id().await?;
            record.set_id(id);
        }
        let key = record.key(&self.name);
        debug!(collection = %self.name, %key, "create");

        let value = record.to_value();
        let encoded = StoredValue::from_value(value.clone()).encode()?;
        self.storage.put(Bytes::from(key.clone()), encoded).await?;

        let mut index = self.index.lock().await;
        index.push_unique(key);
        self.persist_index(&index).await?;
        Ok(value)
    }

    /// Reads a record by its own key.
    pub async fn find(&self, record: &Record) -> Result<Value> {
        let key = record.key(&self.name);
        debug!(collection = %self.name, %key, "find");

        match self.storage.get(Bytes::from(key)).await? {
            Some(bytes) => Ok(StoredValue::decode(&bytes)?.into_value()),
            None => Err(self.not_found(record, "read")),
        }
    }

    /// Loads every record in the collection and evaluates the query over
    /// the loaded set.
    ///
    /// One read is dispatched per indexed key; all reads complete before
    /// query evaluation, and any read failure surfaces. An empty index
    /// returns an empty result without touching storage.
    pub async fn find_all(&self, query: &Query) -> Result<Vec<Value>> {
        let keys: Vec<String> = self.index.lock().await.keys().to_vec();
        debug!(collection = %self.name, keys = keys.len(), "find_all");
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let reads = keys.iter().map(|key| self.storage.get(Bytes::from(key.clone())));
        let results = join_all(reads).await;

        let mut records = Vec::with_capacity(keys.len());
        for (key, result) in keys.iter().zip(results) {
            match result? {
                Some(bytes) => records.push(StoredValue::decode(&bytes)?.into_value()),
                // Unreachable while the index invariant holds; skip rather
                // than poison the whole query.
                None => warn!(collection = %self.name, %key, "indexed key missing from storage"),
            }
        }

        Ok(query.apply(records))
    }

    /// Looks up a single record by its indexed attributes.
    ///
    /// The filter is restricted to the record's populated attributes that
    /// are declared in [`Config::indexed_fields`]. Returns the first match.
    pub async fn fetch(&self, record: &Record) -> Result<Value> {
        let mut filter = Filter::new();
        for field in &self.indexed_fields {
            if let Some(value) = record.get(field) {
                filter = filter.eq(field.clone(), value.clone());
            }
        }
        if filter.is_empty() {
            return Err(Error::InvalidQuery(
                "cannot fetch record with given attributes".to_string(),
            ));
        }

        let query = Query::new()
            .with_filter(filter)
            .with_id_field(record.id_field());
        let results = self.find_all(&query).await?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| self.not_found(record, "read"))
    }

    /// Updates a record, merging its serialized form into the stored value.
    ///
    /// A new record delegates to [`create`](Self::create). Otherwise the
    /// current stored value is read, merged per its shape (field maps merge
    /// field-wise, sequences append-and-deduplicate, scalars are replaced),
    /// and written back. The key is re-added to the in-memory index if it
    /// went missing, but the index is not re-persisted here.
    pub async fn update(&self, record: &mut Record) -> Result<Value> {
        if record.is_new() {
            return self.create(record).await;
        }
        let key = record.key(&self.name);
        debug!(collection = %self.name, %key, "update");

        let merged = match self.storage.get(Bytes::from(key.clone())).await? {
            Some(bytes) => StoredValue::decode(&bytes)?.merge(record.to_value()),
            None => StoredValue::from_value(record.to_value()),
        };
        self.storage
            .put(Bytes::from(key.clone()), merged.encode()?)
            .await?;

        self.index.lock().await.push_unique(key);
        Ok(merged.into_value())
    }

    /// Increases a numeric attribute of the stored record.
    ///
    /// Reads the current stored value, adds `inc.amount` to the attribute
    /// (0 when unset), and writes the result back. The read and write are
    /// not atomic across concurrent callers.
    pub async fn increment(&self, record: &Record, inc: &Increment) -> Result<Value> {
        let key = record.key(&self.name);
        debug!(collection = %self.name, %key, attribute = %inc.attribute, amount = inc.amount, "increment");

        let Some(bytes) = self.storage.get(Bytes::from(key.clone())).await? else {
            if inc.ignore_failures {
                return Ok(record.to_value());
            }
            return Err(self.not_found(record, "increment"));
        };

        let StoredValue::Map(mut fields) = StoredValue::decode(&bytes)? else {
            return Err(Error::Codec(
                "increment target is not a field map".to_string(),
            ));
        };
        let current = fields
            .get(&inc.attribute)
            .and_then(Value::as_i64)
            .unwrap_or(0);
        fields.insert(inc.attribute.clone(), Value::from(current + inc.amount));

        let updated = StoredValue::Map(fields);
        self.storage
            .put(Bytes::from(key), updated.encode()?)
            .await?;
        Ok(updated.into_value())
    }

    /// Destroys a record: removes it from storage and from the key index,
    /// then persists the index.
    ///
    /// Fails with a not-found error when the key was not present in the
    /// index; the index is left unchanged in that case.
    pub async fn destroy(&self, record: &Record) -> Result<()> {
        if record.is_new() {
            return Err(self.not_found(record, "destroy"));
        }
        let key = record.key(&self.name);
        debug!(collection = %self.name, %key, "destroy");

        self.storage.remove(Bytes::from(key.clone())).await?;

        let mut index = self.index.lock().await;
        if !index.remove_first(&key) {
            return Err(self.not_found(record, "destroy"));
        }
        self.persist_index(&index).await
    }

    /// Persists the in-memory key index under the collection name.
    async fn persist_index(&self, index: &KeyIndex) -> Result<()> {
        self.storage
            .put(Bytes::from(self.name.clone()), index.encode())
            .await?;
        Ok(())
    }

    fn not_found(&self, record: &Record, op: &'static str) -> Error {
        Error::NotFound {
            collection: self.name.clone(),
            id: record
                .id()
                .map(|id| id.to_string())
                .unwrap_or_else(|| "(new)".to_string()),
            op,
        }
    }
}

#[cfg(test)]
mod tests {
    use common::InMemoryStorage;
    use serde_json::json;

    use super::*;
    use crate::model::RecordId;

    async fn open_store(storage: Arc<dyn Storage>) -> RecordStore {
        RecordStore::open(storage, Config::new("mymodels"))
            .await
            .unwrap()
    }

    fn record(fields: Value) -> Record {
        match fields {
            Value::Object(map) => Record::from_fields(map),
            _ => panic!("test records must be field maps"),
        }
    }

    #[tokio::test]
    async fn should_assign_sequential_identities_on_create() {
        // given
        let store = open_store(Arc::new(InMemoryStorage::new())).await;
        let mut first = record(json!({"name": "a"}));
        let mut second = record(json!({"name": "b"}));

        // when
        store.create(&mut first).await.unwrap();
        store.create(&mut second).await.unwrap();

        // then
        assert_eq!(first.id(), Some(RecordId::Int(1)));
        assert_eq!(second.id(), Some(RecordId::Int(2)));
    }

    #[tokio::test]
    async fn should_keep_a_supplied_identity_on_create() {
        // given
        let store = open_store(Arc::new(InMemoryStorage::new())).await;
        let mut rec = record(json!({"id": 42, "name": "a"}));

        // when
        let stored = store.create(&mut rec).await.unwrap();

        // then
        assert_eq!(rec.id(), Some(RecordId::Int(42)));
        assert_eq!(stored["id"], json!(42));
    }

    #[tokio::test]
    async fn should_roundtrip_create_and_find() {
        // given
        let store = open_store(Arc::new(InMemoryStorage::new())).await;
        let mut rec = record(json!({"name": "alice", "age": 30}));

        // when
        let stored = store.create(&mut rec).await.unwrap();
        let found = store.find(&rec).await.unwrap();

        // then
        assert_eq!(found, stored);
        assert_eq!(found["name"], json!("alice"));
    }

    #[tokio::test]
    async fn should_fail_find_for_a_never_created_record() {
        // given
        let store = open_store(Arc::new(InMemoryStorage::new())).await;
        let rec = record(json!({"id": 9}));

        // when
        let result = store.find(&rec).await;

        // then
        assert_eq!(
            result,
            Err(Error::NotFound {
                collection: "mymodels".to_string(),
                id: "9".to_string(),
                op: "read",
            })
        );
    }

    #[tokio::test]
    async fn should_list_all_created_records() {
        // given
        let store = open_store(Arc::new(InMemoryStorage::new())).await;
        for name in ["a", "b", "c"] {
            store.create(&mut record(json!({"name": name}))).await.unwrap();
        }

        // when
        let all = store.find_all(&Query::new()).await.unwrap();

        // then
        assert_eq!(all.len(), 3);
        assert_eq!(all[0]["name"], json!("a"));
        assert_eq!(all[2]["name"], json!("c"));
    }

    #[tokio::test]
    async fn should_return_empty_result_without_reads_for_an_empty_collection() {
        // given
        let store = open_store(Arc::new(InMemoryStorage::new())).await;

        // when
        let all = store.find_all(&Query::new()).await.unwrap();

        // then
        assert!(all.is_empty());
    }

    #[tokio::test]
    async fn should_merge_field_maps_on_update() {
        // given
        let store = open_store(Arc::new(InMemoryStorage::new())).await;
        let mut rec = record(json!({"name": "alice", "age": 30}));
        store.create(&mut rec).await.unwrap();

        // when - update through a sparse record carrying the same identity
        let mut sparse = record(json!({"id": 1, "age": 31}));
        let updated = store.update(&mut sparse).await.unwrap();

        // then - unmentioned stored fields survive
        assert_eq!(updated["name"], json!("alice"));
        assert_eq!(updated["age"], json!(31));
        assert_eq!(store.find(&rec).await.unwrap(), updated);
    }

    #[tokio::test]
    async fn should_create_when_updating_a_new_record() {
        // given
        let store = open_store(Arc::new(InMemoryStorage::new())).await;
        let mut rec = record(json!({"name": "alice"}));

        // when
        store.update(&mut rec).await.unwrap();

        // then
        assert_eq!(rec.id(), Some(RecordId::Int(1)));
        assert_eq!(store.find_all(&Query::new()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn should_not_duplicate_index_entries_on_update() {
        // given
        let store = open_store(Arc::new(InMemoryStorage::new())).await;
        let mut rec = record(json!({"name": "alice"}));
        store.create(&mut rec).await.unwrap();

        // when
        store.update(&mut rec).await.unwrap();
        store.update(&mut rec).await.unwrap();

        // then
        assert_eq!(store.find_all(&Query::new()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn should_increment_an_existing_attribute() {
        // given
        let store = open_store(Arc::new(InMemoryStorage::new())).await;
        let mut rec = record(json!({"visits": 10}));
        store.create(&mut rec).await.unwrap();

        // when
        let updated = store
            .increment(&rec, &Increment::new("visits", 5))
            .await
            .unwrap();

        // then
        assert_eq!(updated["visits"], json!(15));
    }

    #[tokio::test]
    async fn should_default_a_missing_increment_attribute_to_zero() {
        // given
        let store = open_store(Arc::new(InMemoryStorage::new())).await;
        let mut rec = record(json!({"name": "alice"}));
        store.create(&mut rec).await.unwrap();

        // when
        let updated = store
            .increment(&rec, &Increment::new("visits", 3))
            .await
            .unwrap();

        // then
        assert_eq!(updated["visits"], json!(3));
    }

    #[tokio::test]
    async fn should_fail_increment_on_an_absent_record() {
        // given
        let store = open_store(Arc::new(InMemoryStorage::new())).await;
        let rec = record(json!({"id": 7}));

        // when
        let result = store.increment(&rec, &Increment::new("visits", 1)).await;

        // then
        assert_eq!(
            result,
            Err(Error::NotFound {
                collection: "mymodels".to_string(),
                id: "7".to_string(),
                op: "increment",
            })
        );
    }

    #[tokio::test]
    async fn should_ignore_absent_increment_target_when_asked() {
        // given
        let store = open_store(Arc::new(InMemoryStorage::new())).await;
        let rec = record(json!({"id": 7, "visits": 1}));

        // when
        let result = store
            .increment(&rec, &Increment::new("visits", 1).ignoring_failures())
            .await
            .unwrap();

        // then - the record's own form comes back unchanged
        assert_eq!(result, json!({"id": 7, "visits": 1}));
    }

    #[tokio::test]
    async fn should_destroy_a_record_and_drop_it_from_queries() {
        // given
        let store = open_store(Arc::new(InMemoryStorage::new())).await;
        let mut rec = record(json!({"name": "alice"}));
        store.create(&mut rec).await.unwrap();

        // when
        store.destroy(&rec).await.unwrap();

        // then
        assert!(store.find(&rec).await.is_err());
        assert!(store.find_all(&Query::new()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn should_fail_destroy_for_an_unindexed_key() {
        // given
        let store = open_store(Arc::new(InMemoryStorage::new())).await;
        let mut rec = record(json!({"name": "alice"}));
        store.create(&mut rec).await.unwrap();
        let stranger = record(json!({"id": 99}));

        // when
        let result = store.destroy(&stranger).await;

        // then - and the index still lists the live record
        assert!(matches!(result, Err(Error::NotFound { op: "destroy", .. })));
        assert_eq!(store.find_all(&Query::new()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn should_fail_destroy_for_a_new_record() {
        // given
        let store = open_store(Arc::new(InMemoryStorage::new())).await;
        let rec = record(json!({"name": "alice"}));

        // when
        let result = store.destroy(&rec).await;

        // then
        assert_eq!(
            result,
            Err(Error::NotFound {
                collection: "mymodels".to_string(),
                id: "(new)".to_string(),
                op: "destroy",
            })
        );
    }

    #[tokio::test]
    async fn should_fetch_a_record_by_indexed_attributes() {
        // given
        let storage: Arc<dyn Storage> = Arc::new(InMemoryStorage::new());
        let store = RecordStore::open(
            storage,
            Config::new("mymodels").with_indexed_fields(["name"]),
        )
        .await
        .unwrap();
        store
            .create(&mut record(json!({"name": "alice", "age": 30})))
            .await
            .unwrap();
        store
            .create(&mut record(json!({"name": "bob", "age": 40})))
            .await
            .unwrap();

        // when
        let found = store.fetch(&record(json!({"name": "bob"}))).await.unwrap();

        // then
        assert_eq!(found["age"], json!(40));
    }

    #[tokio::test]
    async fn should_reject_fetch_without_any_indexed_attribute() {
        // given
        let storage: Arc<dyn Storage> = Arc::new(InMemoryStorage::new());
        let store = RecordStore::open(
            storage,
            Config::new("mymodels").with_indexed_fields(["name"]),
        )
        .await
        .unwrap();

        // when - only an unindexed attribute is populated
        let result = store.fetch(&record(json!({"age": 30}))).await;

        // then
        assert!(matches!(result, Err(Error::InvalidQuery(_))));
    }

    #[tokio::test]
    async fn should_fail_fetch_when_no_row_matches() {
        // given
        let storage: Arc<dyn Storage> = Arc::new(InMemoryStorage::new());
        let store = RecordStore::open(
            storage,
            Config::new("mymodels").with_indexed_fields(["name"]),
        )
        .await
        .unwrap();
        store
            .create(&mut record(json!({"name": "alice"})))
            .await
            .unwrap();

        // when
        let result = store.fetch(&record(json!({"name": "nobody"}))).await;

        // then
        assert!(matches!(result, Err(Error::NotFound { op: "read", .. })));
    }
}
