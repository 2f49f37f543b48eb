//! In-memory document store.

use crate::error::{ClientError, ClientResult};
use crate::query::{Command, Filter, IndexModel, QueryOptions, Update, UpdateResult, ID_FIELD};
use crate::traits::{Cursor, DocumentClient, DocumentCollection, DocumentDatabase};
use entistore_codec::{decode_document, encode_document, encode_value, Document, Value};
use parking_lot::{Mutex, MutexGuard, RwLock};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// URI scheme accepted by [`MemoryClient`].
pub const MEMORY_SCHEME: &str = "memory://";

/// Default number of items returned per cursor batch.
pub const DEFAULT_BATCH_SIZE: usize = 101;

/// An in-memory document store.
///
/// This store is suitable for:
/// - Unit and integration tests
/// - Local runs of services that do not need persistence
///
/// Documents are held as CBOR bytes keyed by `_id`, in insertion order.
/// TTL indexes are honoured lazily: expired documents are purged whenever
/// their collection is touched.
///
/// The store also exposes fault injection (`set_reachable`,
/// `fail_index_creation`, `collide_inserts`, `set_ping_delay`) and counters ([`MemoryStats`])
/// so callers can assert how it was used.
///
/// # Example
///
/// ```rust
/// use entistore_client::{DocumentClient, Filter, MemoryClient, QueryOptions};
/// use entistore_codec::Document;
///
/// let client = MemoryClient::new();
/// client.connect("memory://local").unwrap();
/// let db = client.database("app").unwrap();
/// let users = db.collection("User").unwrap();
///
/// users.insert_one(Document::new().with("_id", 1).with("name", "Zawadi")).unwrap();
/// assert_eq!(users.count(&Filter::All, &QueryOptions::default()).unwrap(), 1);
/// ```
#[derive(Clone, Default)]
pub struct MemoryClient {
    inner: Arc<ClientInner>,
}

#[derive(Default)]
struct ClientInner {
    uri: RwLock<Option<String>>,
    databases: RwLock<HashMap<String, Arc<MemoryDatabase>>>,
    shared: Arc<Shared>,
}

struct Shared {
    reachable: AtomicBool,
    fail_index_creation: AtomicBool,
    insert_collisions: AtomicUsize,
    ping_delay_ms: AtomicU64,
    batch_size: AtomicUsize,
    stats: MemoryStats,
}

impl Default for Shared {
    fn default() -> Self {
        Self {
            reachable: AtomicBool::new(true),
            fail_index_creation: AtomicBool::new(false),
            insert_collisions: AtomicUsize::new(0),
            ping_delay_ms: AtomicU64::new(0),
            batch_size: AtomicUsize::new(DEFAULT_BATCH_SIZE),
            stats: MemoryStats::default(),
        }
    }
}

impl Shared {
    fn check_reachable(&self) -> ClientResult<()> {
        if self.reachable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(ClientError::unreachable("memory store is marked unreachable"))
        }
    }

    fn take_insert_collision(&self) -> bool {
        self.insert_collisions
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn cursor<T: Send>(self: &Arc<Self>, items: Vec<T>) -> Box<dyn Cursor<T>>
    where
        T: 'static,
    {
        self.stats.open_cursors.fetch_add(1, Ordering::SeqCst);
        Box::new(MemoryCursor {
            items: items.into(),
            batch_size: self.batch_size.load(Ordering::SeqCst).max(1),
            shared: Arc::clone(self),
        })
    }
}

/// Usage counters of a [`MemoryClient`].
#[derive(Debug, Default)]
pub struct MemoryStats {
    connects: AtomicUsize,
    collection_requests: AtomicUsize,
    index_listings: AtomicUsize,
    index_creations: AtomicUsize,
    open_cursors: AtomicUsize,
    pings: AtomicUsize,
}

impl MemoryStats {
    /// Number of successful `connect` calls.
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// Number of `collection()` requests across all databases.
    pub fn collection_requests(&self) -> usize {
        self.collection_requests.load(Ordering::SeqCst)
    }

    /// Number of `list_indexes` calls.
    pub fn index_listings(&self) -> usize {
        self.index_listings.load(Ordering::SeqCst)
    }

    /// Number of indexes actually created.
    pub fn index_creations(&self) -> usize {
        self.index_creations.load(Ordering::SeqCst)
    }

    /// Cursors handed out and not yet dropped.
    pub fn open_cursors(&self) -> usize {
        self.open_cursors.load(Ordering::SeqCst)
    }

    /// Number of `ping` commands received.
    pub fn pings(&self) -> usize {
        self.pings.load(Ordering::SeqCst)
    }
}

impl MemoryClient {
    /// Creates a new, unconnected in-memory client.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Usage counters.
    #[must_use]
    pub fn stats(&self) -> &MemoryStats {
        &self.inner.shared.stats
    }

    /// Makes every subsequent operation fail with `Unreachable` (or succeed again).
    pub fn set_reachable(&self, reachable: bool) {
        self.inner.shared.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Makes index creation fail.
    pub fn fail_index_creation(&self, fail: bool) {
        self.inner
            .shared
            .fail_index_creation
            .store(fail, Ordering::SeqCst);
    }

    /// Makes the next `count` inserts fail with `DuplicateKey` without
    /// writing, as if another writer had inserted the same `_id` and then
    /// removed it.
    pub fn collide_inserts(&self, count: usize) {
        self.inner
            .shared
            .insert_collisions
            .store(count, Ordering::SeqCst);
    }

    /// Delays every `ping` by the given duration.
    pub fn set_ping_delay(&self, delay: Duration) {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.inner.shared.ping_delay_ms.store(millis, Ordering::SeqCst);
    }

    /// Sets how many items each cursor batch carries.
    pub fn set_batch_size(&self, size: usize) {
        self.inner.shared.batch_size.store(size, Ordering::SeqCst);
    }

    /// The connection string passed to `connect`, if any.
    #[must_use]
    pub fn uri(&self) -> Option<String> {
        self.inner.uri.read().clone()
    }
}

impl DocumentClient for MemoryClient {
    fn connect(&self, uri: &str) -> ClientResult<()> {
        if !uri.starts_with(MEMORY_SCHEME) {
            return Err(ClientError::InvalidUri {
                uri: uri.to_string(),
                message: format!("expected a {MEMORY_SCHEME} connection string"),
            });
        }
        *self.inner.uri.write() = Some(uri.to_string());
        self.inner.shared.stats.connects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn database(&self, name: &str) -> ClientResult<Arc<dyn DocumentDatabase>> {
        if self.inner.uri.read().is_none() {
            return Err(ClientError::NotConnected);
        }
        self.inner.shared.check_reachable()?;

        let mut databases = self.inner.databases.write();
        let database = databases.entry(name.to_string()).or_insert_with(|| {
            Arc::new(MemoryDatabase {
                name: name.to_string(),
                shared: Arc::clone(&self.inner.shared),
                collections: RwLock::new(HashMap::new()),
            })
        });
        Ok(Arc::clone(database) as Arc<dyn DocumentDatabase>)
    }
}

/// A database inside a [`MemoryClient`].
pub struct MemoryDatabase {
    name: String,
    shared: Arc<Shared>,
    collections: RwLock<HashMap<String, Arc<MemoryCollection>>>,
}

impl DocumentDatabase for MemoryDatabase {
    fn name(&self) -> &str {
        &self.name
    }

    fn collection(&self, name: &str) -> ClientResult<Arc<dyn DocumentCollection>> {
        self.shared.check_reachable()?;
        self.shared
            .stats
            .collection_requests
            .fetch_add(1, Ordering::SeqCst);

        let mut collections = self.collections.write();
        let collection = collections.entry(name.to_string()).or_insert_with(|| {
            Arc::new(MemoryCollection {
                name: name.to_string(),
                shared: Arc::clone(&self.shared),
                state: Mutex::new(CollectionState::new()),
            })
        });
        Ok(Arc::clone(collection) as Arc<dyn DocumentCollection>)
    }

    fn drop_collection(&self, name: &str) -> ClientResult<()> {
        self.shared.check_reachable()?;
        // Handles stay valid: a dropped collection is emptied in place and
        // comes back (without secondary indexes) on the next write.
        if let Some(collection) = self.collections.read().get(name) {
            *collection.state.lock() = CollectionState::dropped();
        }
        Ok(())
    }

    fn list_collection_names(&self) -> ClientResult<Vec<String>> {
        self.shared.check_reachable()?;
        let mut names: Vec<String> = self
            .collections
            .read()
            .iter()
            .filter(|(_, c)| !c.state.lock().dropped)
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        Ok(names)
    }

    fn run_command(&self, command: Command) -> ClientResult<Document> {
        match command {
            Command::Ping => {
                self.shared.stats.pings.fetch_add(1, Ordering::SeqCst);
                let delay = self.shared.ping_delay_ms.load(Ordering::SeqCst);
                if delay > 0 {
                    std::thread::sleep(Duration::from_millis(delay));
                }
                self.shared.check_reachable()?;
                Ok(Document::new().with("ok", 1.0))
            }
        }
    }
}

struct StoredDocument {
    key: Vec<u8>,
    bytes: Vec<u8>,
}

struct CollectionState {
    documents: BTreeMap<u64, StoredDocument>,
    keys: HashMap<Vec<u8>, u64>,
    next_seq: u64,
    indexes: Vec<IndexModel>,
    dropped: bool,
}

impl CollectionState {
    fn new() -> Self {
        Self {
            documents: BTreeMap::new(),
            keys: HashMap::new(),
            next_seq: 0,
            indexes: vec![IndexModel::primary()],
            dropped: false,
        }
    }

    fn dropped() -> Self {
        Self {
            dropped: true,
            ..Self::new()
        }
    }

    fn matching(&self, filter: &Filter, fold_case: bool) -> ClientResult<Vec<(u64, Document)>> {
        let mut out = Vec::new();
        for (seq, stored) in &self.documents {
            let doc = decode_document(&stored.bytes)?;
            if filter.matches(&doc, fold_case) {
                out.push((*seq, doc));
            }
        }
        Ok(out)
    }

    fn remove(&mut self, seq: u64) -> bool {
        match self.documents.remove(&seq) {
            Some(stored) => {
                self.keys.remove(&stored.key);
                true
            }
            None => false,
        }
    }

    fn purge_expired(&mut self, now_millis: i64) -> usize {
        let ttl: Vec<(String, i64)> = self
            .indexes
            .iter()
            .filter_map(|index| {
                let field = index.keys.first()?;
                let after = i64::try_from(index.expire_after?.as_millis()).ok()?;
                Some((field.clone(), after))
            })
            .collect();
        if ttl.is_empty() {
            return 0;
        }

        let expired: Vec<u64> = self
            .documents
            .iter()
            .filter(|(_, stored)| {
                let Ok(doc) = decode_document(&stored.bytes) else {
                    return false;
                };
                ttl.iter().any(|(field, after)| {
                    matches!(doc.get_path(field), Some(Value::Integer(at))
                        if at.saturating_add(*after) <= now_millis)
                })
            })
            .map(|(seq, _)| *seq)
            .collect();

        for seq in &expired {
            self.remove(*seq);
        }
        expired.len()
    }
}

/// A collection inside a [`MemoryDatabase`].
pub struct MemoryCollection {
    name: String,
    shared: Arc<Shared>,
    state: Mutex<CollectionState>,
}

impl MemoryCollection {
    /// Locks the collection after expiring documents whose TTL has passed.
    fn live(&self) -> ClientResult<MutexGuard<'_, CollectionState>> {
        self.shared.check_reachable()?;
        let mut state = self.state.lock();
        let purged = state.purge_expired(chrono::Utc::now().timestamp_millis());
        if purged > 0 {
            tracing::trace!(collection = %self.name, purged, "expired documents removed");
        }
        Ok(state)
    }
}

impl DocumentCollection for MemoryCollection {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_indexes(&self) -> ClientResult<Box<dyn Cursor<IndexModel>>> {
        let state = self.live()?;
        self.shared.stats.index_listings.fetch_add(1, Ordering::SeqCst);
        Ok(self.shared.cursor(state.indexes.clone()))
    }

    fn create_index(&self, model: IndexModel) -> ClientResult<String> {
        let mut state = self.live()?;
        if self.shared.fail_index_creation.load(Ordering::SeqCst) {
            return Err(ClientError::IndexCreation {
                collection: self.name.clone(),
                index: model.name,
                message: "index creation disabled by fault injection".into(),
            });
        }
        if model.keys.is_empty() {
            return Err(ClientError::IndexCreation {
                collection: self.name.clone(),
                index: model.name,
                message: "an index needs at least one key".into(),
            });
        }

        if let Some(existing) = state.indexes.iter().find(|i| i.name == model.name) {
            if existing.keys == model.keys {
                return Ok(model.name);
            }
            return Err(ClientError::IndexCreation {
                collection: self.name.clone(),
                index: model.name,
                message: format!("an index with this name exists on {:?}", existing.keys),
            });
        }

        let name = model.name.clone();
        state.indexes.push(model);
        state.dropped = false;
        self.shared.stats.index_creations.fetch_add(1, Ordering::SeqCst);
        Ok(name)
    }

    fn count(&self, filter: &Filter, options: &QueryOptions) -> ClientResult<u64> {
        let state = self.live()?;
        Ok(state.matching(filter, options.folds_case())?.len() as u64)
    }

    fn distinct(
        &self,
        field: &str,
        filter: &Filter,
        options: &QueryOptions,
    ) -> ClientResult<Box<dyn Cursor<Value>>> {
        let fold_case = options.folds_case();
        let state = self.live()?;

        let mut values: Vec<Value> = Vec::new();
        for (_, doc) in state.matching(filter, fold_case)? {
            let candidates = match doc.get_path(field) {
                None => continue,
                Some(Value::Array(items)) => items.clone(),
                Some(value) => vec![value.clone()],
            };
            for candidate in candidates {
                if !values.iter().any(|v| v.matches(&candidate, fold_case)) {
                    values.push(candidate);
                }
            }
        }
        Ok(self.shared.cursor(values))
    }

    fn find(
        &self,
        filter: &Filter,
        options: &QueryOptions,
    ) -> ClientResult<Box<dyn Cursor<Document>>> {
        let state = self.live()?;
        let docs = state
            .matching(filter, options.folds_case())?
            .into_iter()
            .map(|(_, doc)| doc)
            .collect();
        Ok(self.shared.cursor(docs))
    }

    fn insert_one(&self, document: Document) -> ClientResult<()> {
        let mut state = self.live()?;
        let id = document
            .get(ID_FIELD)
            .ok_or_else(|| ClientError::MissingId {
                collection: self.name.clone(),
            })?;
        let key = encode_value(id)?;
        if state.keys.contains_key(&key) || self.shared.take_insert_collision() {
            return Err(ClientError::DuplicateKey {
                collection: self.name.clone(),
                id: id.to_string(),
            });
        }

        let bytes = encode_document(&document)?;
        let seq = state.next_seq;
        state.next_seq += 1;
        state.keys.insert(key.clone(), seq);
        state.documents.insert(seq, StoredDocument { key, bytes });
        state.dropped = false;
        Ok(())
    }

    fn find_one_and_replace(
        &self,
        filter: &Filter,
        mut replacement: Document,
    ) -> ClientResult<Option<Document>> {
        let mut state = self.live()?;
        let Some((seq, previous)) = state.matching(filter, false)?.into_iter().next() else {
            return Ok(None);
        };

        let previous_id = previous.get(ID_FIELD).cloned().unwrap_or(Value::Null);
        match replacement.get(ID_FIELD) {
            Some(id) if !id.matches(&previous_id, false) => {
                return Err(ClientError::ImmutableId {
                    collection: self.name.clone(),
                });
            }
            Some(_) => {}
            None => {
                replacement.insert(ID_FIELD, previous_id);
            }
        }

        let bytes = encode_document(&replacement)?;
        if let Some(stored) = state.documents.get_mut(&seq) {
            stored.bytes = bytes;
        }
        Ok(Some(previous))
    }

    fn update_many(
        &self,
        filter: &Filter,
        update: &Update,
        options: &QueryOptions,
    ) -> ClientResult<UpdateResult> {
        let mut state = self.live()?;
        let mut result = UpdateResult::default();

        for (seq, doc) in state.matching(filter, options.folds_case())? {
            result.matched += 1;
            let mut updated = doc.clone();
            update.apply(&mut updated)?;
            if updated != doc {
                let bytes = encode_document(&updated)?;
                if let Some(stored) = state.documents.get_mut(&seq) {
                    stored.bytes = bytes;
                }
                result.modified += 1;
            }
        }
        Ok(result)
    }

    fn delete_one(&self, filter: &Filter) -> ClientResult<u64> {
        let mut state = self.live()?;
        let first = state.matching(filter, false)?.into_iter().next();
        Ok(match first {
            Some((seq, _)) => u64::from(state.remove(seq)),
            None => 0,
        })
    }

    fn delete_many(&self, filter: &Filter, options: &QueryOptions) -> ClientResult<u64> {
        let mut state = self.live()?;
        let mut deleted = 0;
        for (seq, _) in state.matching(filter, options.folds_case())? {
            if state.remove(seq) {
                deleted += 1;
            }
        }
        Ok(deleted)
    }
}

struct MemoryCursor<T> {
    items: VecDeque<T>,
    batch_size: usize,
    shared: Arc<Shared>,
}

impl<T: Send> Cursor<T> for MemoryCursor<T> {
    fn next_batch(&mut self) -> ClientResult<Option<Vec<T>>> {
        if self.items.is_empty() {
            return Ok(None);
        }
        let take = self.batch_size.min(self.items.len());
        Ok(Some(self.items.drain(..take).collect()))
    }
}

impl<T> Drop for MemoryCursor<T> {
    fn drop(&mut self) {
        self.shared.stats.open_cursors.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Comparison;

    fn collection(client: &MemoryClient, name: &str) -> Arc<dyn DocumentCollection> {
        client.connect("memory://test").unwrap();
        client.database("db").unwrap().collection(name).unwrap()
    }

    fn drain<T>(mut cursor: Box<dyn Cursor<T>>) -> Vec<T> {
        let mut out = Vec::new();
        while let Some(batch) = cursor.next_batch().unwrap() {
            out.extend(batch);
        }
        out
    }

    fn person(id: i64, name: &str) -> Document {
        Document::new().with("_id", id).with("name", name)
    }

    #[test]
    fn database_requires_connect() {
        let client = MemoryClient::new();
        assert!(matches!(
            client.database("db"),
            Err(ClientError::NotConnected)
        ));
    }

    #[test]
    fn connect_rejects_other_schemes() {
        let client = MemoryClient::new();
        assert!(matches!(
            client.connect("mongodb://localhost"),
            Err(ClientError::InvalidUri { .. })
        ));
        assert_eq!(client.stats().connects(), 0);
    }

    #[test]
    fn insert_find_and_duplicate_key() {
        let client = MemoryClient::new();
        let people = collection(&client, "Person");

        people.insert_one(person(1, "Asha")).unwrap();
        people.insert_one(person(2, "Baraka")).unwrap();
        let err = people.insert_one(person(1, "Asha again")).unwrap_err();
        assert!(err.is_duplicate_key());

        let found = drain(people.find(&Filter::All, &QueryOptions::default()).unwrap());
        assert_eq!(found, vec![person(1, "Asha"), person(2, "Baraka")]);
    }

    #[test]
    fn insert_without_id_fails() {
        let client = MemoryClient::new();
        let people = collection(&client, "Person");
        let err = people
            .insert_one(Document::new().with("name", "nobody"))
            .unwrap_err();
        assert!(matches!(err, ClientError::MissingId { .. }));
    }

    #[test]
    fn find_one_and_replace_keeps_position_and_id() {
        let client = MemoryClient::new();
        let people = collection(&client, "Person");
        people.insert_one(person(1, "Asha")).unwrap();
        people.insert_one(person(2, "Baraka")).unwrap();

        let previous = people
            .find_one_and_replace(&Filter::id(1), person(1, "Asha K."))
            .unwrap();
        assert_eq!(previous, Some(person(1, "Asha")));

        let missing = people
            .find_one_and_replace(&Filter::id(9), person(9, "Ghost"))
            .unwrap();
        assert!(missing.is_none());

        let found = drain(people.find(&Filter::All, &QueryOptions::default()).unwrap());
        assert_eq!(found, vec![person(1, "Asha K."), person(2, "Baraka")]);

        let err = people
            .find_one_and_replace(&Filter::id(2), person(3, "Baraka"))
            .unwrap_err();
        assert!(matches!(err, ClientError::ImmutableId { .. }));
    }

    #[test]
    fn update_and_delete() {
        let client = MemoryClient::new();
        let people = collection(&client, "Person");
        for (id, name) in [(1, "Asha"), (2, "Baraka"), (3, "Chausiku")] {
            people.insert_one(person(id, name)).unwrap();
        }

        let result = people
            .update_many(
                &Filter::field("_id", Comparison::Gte, 2),
                &Update::new().set("vip", true),
                &QueryOptions::default(),
            )
            .unwrap();
        assert_eq!(result, UpdateResult { matched: 2, modified: 2 });

        let again = people
            .update_many(
                &Filter::field("_id", Comparison::Gte, 2),
                &Update::new().set("vip", true),
                &QueryOptions::default(),
            )
            .unwrap();
        assert_eq!(again.modified, 0);

        assert_eq!(people.delete_one(&Filter::eq("vip", true)).unwrap(), 1);
        assert_eq!(
            people
                .delete_many(&Filter::All, &QueryOptions::default())
                .unwrap(),
            2
        );
        assert_eq!(
            people.count(&Filter::All, &QueryOptions::default()).unwrap(),
            0
        );
    }

    #[test]
    fn distinct_unwinds_arrays_and_honours_collation() {
        let client = MemoryClient::new();
        let posts = collection(&client, "Post");
        posts
            .insert_one(
                Document::new()
                    .with("_id", 1)
                    .with("tags", vec![Value::from("rust"), Value::from("db")]),
            )
            .unwrap();
        posts
            .insert_one(Document::new().with("_id", 2).with("tags", "Rust"))
            .unwrap();
        posts.insert_one(Document::new().with("_id", 3)).unwrap();

        let exact = drain(
            posts
                .distinct("tags", &Filter::All, &QueryOptions::default())
                .unwrap(),
        );
        assert_eq!(exact.len(), 3);

        let folded = drain(
            posts
                .distinct(
                    "tags",
                    &Filter::All,
                    &QueryOptions::with_collation(Some(&crate::Collation::case_insensitive(
                        "en",
                    ))),
                )
                .unwrap(),
        );
        assert_eq!(folded, vec![Value::from("rust"), Value::from("db")]);
    }

    #[test]
    fn index_creation_is_idempotent_and_checks_conflicts() {
        let client = MemoryClient::new();
        let people = collection(&client, "Person");

        let model = IndexModel::new("by_name", vec!["name".into()]);
        people.create_index(model.clone()).unwrap();
        people.create_index(model).unwrap();
        assert_eq!(client.stats().index_creations(), 1);

        let conflict = IndexModel::new("by_name", vec!["age".into()]);
        assert!(people.create_index(conflict).is_err());

        let names: Vec<String> = drain(people.list_indexes().unwrap())
            .into_iter()
            .map(|i| i.name)
            .collect();
        assert_eq!(names, vec!["_id_".to_string(), "by_name".to_string()]);
    }

    #[test]
    fn ttl_index_purges_expired_documents() {
        let client = MemoryClient::new();
        let sessions = collection(&client, "Session");
        sessions
            .create_index(
                IndexModel::new("expires_at", vec!["expires_at".into()])
                    .expire_after(Duration::ZERO),
            )
            .unwrap();

        let now = chrono::Utc::now().timestamp_millis();
        sessions
            .insert_one(Document::new().with("_id", 1).with("expires_at", now - 1_000))
            .unwrap();
        sessions
            .insert_one(
                Document::new()
                    .with("_id", 2)
                    .with("expires_at", now + 3_600_000),
            )
            .unwrap();

        assert_eq!(
            sessions
                .count(&Filter::All, &QueryOptions::default())
                .unwrap(),
            1
        );
    }

    #[test]
    fn drop_collection_empties_existing_handles() {
        let client = MemoryClient::new();
        client.connect("memory://test").unwrap();
        let db = client.database("db").unwrap();
        let people = db.collection("Person").unwrap();
        people.insert_one(person(1, "Asha")).unwrap();
        people
            .create_index(IndexModel::new("by_name", vec!["name".into()]))
            .unwrap();

        db.drop_collection("Person").unwrap();
        db.drop_collection("NeverExisted").unwrap();

        assert_eq!(
            people.count(&Filter::All, &QueryOptions::default()).unwrap(),
            0
        );
        assert_eq!(drain(people.list_indexes().unwrap()).len(), 1);
        assert!(db.list_collection_names().unwrap().is_empty());

        people.insert_one(person(2, "Baraka")).unwrap();
        assert_eq!(db.list_collection_names().unwrap(), vec!["Person".to_string()]);
    }

    #[test]
    fn cursors_batch_and_release_on_drop() {
        let client = MemoryClient::new();
        client.set_batch_size(2);
        let people = collection(&client, "Person");
        for id in 0..5 {
            people.insert_one(person(id, "x")).unwrap();
        }

        let mut cursor = people.find(&Filter::All, &QueryOptions::default()).unwrap();
        assert_eq!(client.stats().open_cursors(), 1);
        assert_eq!(cursor.next_batch().unwrap().unwrap().len(), 2);
        drop(cursor);
        assert_eq!(client.stats().open_cursors(), 0);
    }

    #[test]
    fn unreachable_store_fails_operations_and_ping() {
        let client = MemoryClient::new();
        let people = collection(&client, "Person");
        let db = client.database("db").unwrap();
        assert!(db.run_command(Command::Ping).is_ok());

        client.set_reachable(false);
        assert!(matches!(
            people.count(&Filter::All, &QueryOptions::default()),
            Err(ClientError::Unreachable { .. })
        ));
        assert!(db.run_command(Command::Ping).is_err());
        assert!(client.database("db").is_err());
    }

    #[test]
    fn injected_insert_collisions_write_nothing() {
        let client = MemoryClient::new();
        let people = collection(&client, "Person");
        client.collide_inserts(1);

        assert!(people.insert_one(person(1, "a")).unwrap_err().is_duplicate_key());
        assert_eq!(people.count(&Filter::All, &QueryOptions::default()).unwrap(), 0);
        people.insert_one(person(1, "a")).unwrap();
        assert_eq!(people.count(&Filter::All, &QueryOptions::default()).unwrap(), 1);
    }

    #[test]
    fn injected_index_failure() {
        let client = MemoryClient::new();
        let people = collection(&client, "Person");
        client.fail_index_creation(true);
        let err = people
            .create_index(IndexModel::new("by_name", vec!["name".into()]))
            .unwrap_err();
        assert!(matches!(err, ClientError::IndexCreation { .. }));
    }
}
