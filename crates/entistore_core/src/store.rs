//! The entity store.

use crate::audit::{AuditEmitter, AuditSink, OperationType};
use crate::collection::{open_collection, CollectionCache, CollectionHandle, DatabaseConnection};
use crate::config::StoreConfig;
use crate::cursor::{Distinct, EntityCursor};
use crate::entity::{Entity, EntityKey};
use crate::error::{StoreError, StoreResult};
use crate::predicate::Predicate;
use crate::registry::{EntityRegistry, StartupReport};
use entistore_client::{Collation, Command, DocumentClient, Filter, QueryOptions, Update};
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;

/// Typed CRUD and query access to entities in a document database.
///
/// Each operation resolves its collection through the store's
/// [`CollectionCache`]; the first use of a type creates the collection's
/// indexes. Errors propagate to the caller; nothing is retried.
///
/// # Example
///
/// ```rust,ignore
/// let store = EntityStore::builder(config)
///     .client(Arc::new(MemoryClient::new()))
///     .build()?;
///
/// store.put(&order)?;
/// let open = store.find_list(&Predicate::<Order>::new(|o| o.field("status").eq_to("open")), None)?;
/// ```
pub struct EntityStore {
    config: StoreConfig,
    connection: Arc<DatabaseConnection>,
    cache: Arc<CollectionCache>,
    audit: Option<AuditEmitter>,
    ping_in_flight: Arc<AtomicBool>,
}

/// Builder for [`EntityStore`].
#[must_use]
pub struct EntityStoreBuilder {
    config: StoreConfig,
    client: Option<Arc<dyn DocumentClient>>,
    cache: Option<Arc<CollectionCache>>,
    audit_sink: Option<Arc<dyn AuditSink>>,
}

impl EntityStoreBuilder {
    /// Sets the document client.
    pub fn client(mut self, client: Arc<dyn DocumentClient>) -> Self {
        self.client = Some(client);
        self
    }

    /// Shares an existing collection cache.
    ///
    /// All stores sharing a cache must use the same database URI and name.
    pub fn cache(mut self, cache: Arc<CollectionCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Sets the sink receiving audit records.
    ///
    /// Only used when the configuration names an audit stream.
    pub fn audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit_sink = Some(sink);
        self
    }

    /// Validates the configuration, connects the client and builds the store.
    ///
    /// # Errors
    ///
    /// Returns `Config` for missing settings (including an audit stream
    /// without a sink) or a cache bound to another database, and `Client`
    /// if `connect` fails.
    pub fn build(self) -> StoreResult<EntityStore> {
        let config = self.config;
        config.validate()?;
        let client = self
            .client
            .ok_or_else(|| StoreError::config("a document client is required"))?;
        let cache = self.cache.unwrap_or_default();
        cache.bind(&config.database_uri, &config.database_name)?;

        let audit = match (&config.audit_stream_name, self.audit_sink) {
            (Some(stream), Some(sink)) => Some(
                AuditEmitter::start(stream.clone(), config.service_name.clone(), sink)?,
            ),
            (Some(stream), None) => {
                return Err(StoreError::config(format!(
                    "audit stream {stream:?} is configured but no audit sink was provided"
                )));
            }
            (None, _) => None,
        };

        client.connect(&config.database_uri)?;
        tracing::debug!(
            database = %config.database_name,
            audit = audit.is_some(),
            "entity store ready"
        );

        Ok(EntityStore {
            connection: Arc::new(DatabaseConnection::new(
                client,
                config.database_name.clone(),
            )),
            cache,
            audit,
            config,
            ping_in_flight: Arc::new(AtomicBool::new(false)),
        })
    }
}

impl EntityStore {
    /// Starts building a store.
    pub fn builder(config: StoreConfig) -> EntityStoreBuilder {
        EntityStoreBuilder {
            config,
            client: None,
            cache: None,
            audit_sink: None,
        }
    }

    /// The configuration the store was built with.
    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// The collection cache.
    #[must_use]
    pub fn cache(&self) -> &Arc<CollectionCache> {
        &self.cache
    }

    /// Returns `T`'s collection, setting it up on first use.
    ///
    /// # Errors
    ///
    /// Returns connectivity and `IndexReconciliation` errors; nothing is
    /// cached on failure, so the next call retries.
    pub fn collection<T: Entity>(&self) -> StoreResult<CollectionHandle<T>> {
        self.cache
            .get_or_init(|| open_collection::<T>(&self.connection))
    }

    /// Sets up every registered entity type.
    ///
    /// Failures are logged and reported, not returned: a type that fails
    /// here is set up again on its next use.
    pub fn start(&self, registry: &EntityRegistry) -> StartupReport {
        let report = registry.warm(self);
        for (name, err) in &report.failed {
            tracing::warn!(entity_type = %name, error = %err, "collection set-up failed at startup");
        }
        tracing::debug!(
            ready = report.ready.len(),
            failed = report.failed.len(),
            "startup collection set-up finished"
        );
        report
    }

    /// Number of stored entities of type `T`.
    ///
    /// # Errors
    ///
    /// Returns store errors.
    pub fn count<T: Entity>(&self) -> StoreResult<u64> {
        let handle = self.collection::<T>()?;
        tracing::trace!(entity_type = T::NAME, event = "count", "get collection count");
        Ok(handle.raw().count(&Filter::All, &QueryOptions::default())?)
    }

    /// Number of stored entities matching a predicate.
    ///
    /// # Errors
    ///
    /// Returns `Predicate` errors for untranslatable predicates and store errors.
    pub fn count_where<T: Entity>(
        &self,
        predicate: &Predicate<T>,
        collation: Option<&Collation>,
    ) -> StoreResult<u64> {
        let handle = self.collection::<T>()?;
        let filter = predicate.to_filter()?;
        tracing::trace!(entity_type = T::NAME, event = "count", filter = %filter, "get collection count");
        Ok(handle
            .raw()
            .count(&filter, &QueryOptions::with_collation(collation))?)
    }

    /// Distinct values of `field` over entities matching a predicate.
    ///
    /// The values are produced lazily; the sequence is finite and single-pass.
    ///
    /// # Errors
    ///
    /// Returns `Predicate` errors for untranslatable predicates and store
    /// errors. Values that do not decode as `F` are reported per item.
    pub fn distinct<T: Entity, F: DeserializeOwned>(
        &self,
        field: &str,
        predicate: &Predicate<T>,
        collation: Option<&Collation>,
    ) -> StoreResult<Distinct<F>> {
        let handle = self.collection::<T>()?;
        let filter = predicate.to_filter()?;
        tracing::trace!(
            entity_type = T::NAME,
            event = "distinct",
            field,
            filter = %filter,
            "get distinct"
        );
        let cursor = handle
            .raw()
            .distinct(field, &filter, &QueryOptions::with_collation(collation))?;
        Ok(Distinct::new(cursor))
    }

    /// The entity with the given identity, if any.
    ///
    /// # Errors
    ///
    /// Returns store errors; a missing entity is `Ok(None)`.
    pub fn get<T: Entity>(&self, id: &T::Id) -> StoreResult<Option<T>> {
        let handle = self.collection::<T>()?;
        tracing::trace!(entity_type = T::NAME, event = "get entity", id = %id, "get entity");
        let cursor = handle
            .raw()
            .find(&Filter::id(id.to_value()), &QueryOptions::default())?;
        EntityCursor::new(cursor).next().transpose()
    }

    /// Entities matching a predicate, streamed lazily.
    ///
    /// # Errors
    ///
    /// Returns `Predicate` errors for untranslatable predicates and store errors.
    pub fn find<T: Entity>(
        &self,
        predicate: &Predicate<T>,
        collation: Option<&Collation>,
    ) -> StoreResult<EntityCursor<T>> {
        let handle = self.collection::<T>()?;
        let filter = predicate.to_filter()?;
        tracing::trace!(entity_type = T::NAME, event = "find", filter = %filter, "find entities");
        let cursor = handle
            .raw()
            .find(&filter, &QueryOptions::with_collation(collation))?;
        Ok(EntityCursor::new(cursor))
    }

    /// Entities matching a predicate, collected into a list.
    ///
    /// # Errors
    ///
    /// As [`find`](Self::find), plus decoding errors of any entity.
    pub fn find_list<T: Entity>(
        &self,
        predicate: &Predicate<T>,
        collation: Option<&Collation>,
    ) -> StoreResult<Vec<T>> {
        self.find(predicate, collation)?.collect()
    }

    /// Inserts the entity, or replaces the stored entity with the same identity.
    ///
    /// The replace is a single atomic store operation. If no entity with
    /// this identity existed the entity is inserted and an `Insert` audit
    /// record is emitted. When a concurrent `put` inserts the same identity
    /// first, this call completes as a replace: exactly one document
    /// remains and no second `Insert` is audited. If that document is
    /// removed before the replace lands, the insert is attempted again.
    ///
    /// # Errors
    ///
    /// Returns codec and store errors.
    pub fn put<T: Entity>(&self, entity: &T) -> StoreResult<()> {
        let handle = self.collection::<T>()?;
        let document = handle.encode(entity)?;
        let filter = Filter::id(entity.id().to_value());

        loop {
            if handle
                .raw()
                .find_one_and_replace(&filter, document.clone())?
                .is_some()
            {
                tracing::trace!(entity_type = T::NAME, event = "replace entity", id = %entity.id(), "put");
                return Ok(());
            }

            match handle.raw().insert_one(document.clone()) {
                Ok(()) => {
                    tracing::trace!(entity_type = T::NAME, event = "insert entity", id = %entity.id(), "put");
                    self.audit(OperationType::Insert, entity);
                    return Ok(());
                }
                // Another writer inserted first; replace its document, or
                // insert again if it is already gone.
                Err(err) if err.is_duplicate_key() => {
                    tracing::trace!(
                        entity_type = T::NAME,
                        event = "replace entity",
                        id = %entity.id(),
                        "insert lost a race, retrying as replace"
                    );
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Deletes every entity matching `predicate`, then inserts `entity`.
    ///
    /// The two steps are separate store operations: a concurrent reader can
    /// observe the state between them. The audit record is `Update` if
    /// anything was deleted, `Insert` otherwise.
    ///
    /// # Errors
    ///
    /// Returns `Predicate` errors, codec errors and store errors (including
    /// `DuplicateKey` if an entity with the same identity survived the delete).
    pub fn put_replacing<T: Entity>(
        &self,
        entity: &T,
        predicate: &Predicate<T>,
        collation: Option<&Collation>,
    ) -> StoreResult<()> {
        let handle = self.collection::<T>()?;
        let filter = predicate.to_filter()?;
        let document = handle.encode(entity)?;

        let deleted = handle
            .raw()
            .delete_many(&filter, &QueryOptions::with_collation(collation))?;
        handle.raw().insert_one(document)?;

        tracing::trace!(
            entity_type = T::NAME,
            event = "insert entity",
            id = %entity.id(),
            filter = %filter,
            deleted,
            "put replacing"
        );
        let operation = if deleted > 0 {
            OperationType::Update
        } else {
            OperationType::Insert
        };
        self.audit(operation, entity);
        Ok(())
    }

    /// Applies a partial update to every entity matching `predicate`.
    ///
    /// Returns the number of entities changed.
    ///
    /// # Errors
    ///
    /// Returns `Predicate` errors and store errors (including `InvalidUpdate`).
    pub fn update<T: Entity>(
        &self,
        predicate: &Predicate<T>,
        update: &Update,
        collation: Option<&Collation>,
    ) -> StoreResult<u64> {
        let handle = self.collection::<T>()?;
        let filter = predicate.to_filter()?;
        let result =
            handle
                .raw()
                .update_many(&filter, update, &QueryOptions::with_collation(collation))?;
        tracing::trace!(
            entity_type = T::NAME,
            event = "update collection",
            filter = %filter,
            update = %update,
            matched = result.matched,
            modified = result.modified,
            "update"
        );
        Ok(result.modified)
    }

    /// Deletes the entity with the given identity.
    ///
    /// Returns true if an entity was deleted.
    ///
    /// # Errors
    ///
    /// Returns store errors.
    pub fn remove<T: Entity>(&self, id: &T::Id) -> StoreResult<bool> {
        let handle = self.collection::<T>()?;
        let deleted = handle.raw().delete_one(&Filter::id(id.to_value()))?;
        tracing::trace!(entity_type = T::NAME, event = "remove entity", id = %id, deleted, "remove");
        Ok(deleted > 0)
    }

    /// Deletes the stored entity with `entity`'s identity.
    ///
    /// # Errors
    ///
    /// Returns store errors.
    pub fn remove_entity<T: Entity>(&self, entity: &T) -> StoreResult<bool> {
        self.remove::<T>(entity.id())
    }

    /// Deletes every entity matching `predicate`; returns how many.
    ///
    /// # Errors
    ///
    /// Returns `Predicate` errors and store errors.
    pub fn remove_where<T: Entity>(
        &self,
        predicate: &Predicate<T>,
        collation: Option<&Collation>,
    ) -> StoreResult<u64> {
        let handle = self.collection::<T>()?;
        let filter = predicate.to_filter()?;
        let deleted = handle
            .raw()
            .delete_many(&filter, &QueryOptions::with_collation(collation))?;
        tracing::trace!(entity_type = T::NAME, event = "remove entity", filter = %filter, deleted, "remove");
        Ok(deleted)
    }

    /// Destroys `T`'s collection with all documents and indexes.
    ///
    /// The cached handle is forgotten, so the next use recreates the
    /// collection's indexes.
    ///
    /// # Errors
    ///
    /// Returns store errors.
    pub fn drop_collection<T: Entity>(&self) -> StoreResult<()> {
        let database = self.connection.get()?;
        database.drop_collection(T::NAME)?;
        self.cache.invalidate::<T>();
        tracing::trace!(entity_type = T::NAME, event = "drop collection", "drop collection");
        Ok(())
    }

    /// Round trip to the database, bounded by `ping_timeout`.
    ///
    /// Returns false on any failure or timeout; never an error. At most one
    /// round trip runs at a time: while a timed-out ping is still waiting on
    /// the database, further calls return false without starting another.
    #[must_use]
    pub fn ping(&self) -> bool {
        if self
            .ping_in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::trace!(event = "ping", "previous ping still pending");
            return false;
        }
        let in_flight = InFlight(Arc::clone(&self.ping_in_flight));
        let connection = Arc::clone(&self.connection);
        let (done, result) = mpsc::channel();

        let spawned = std::thread::Builder::new()
            .name("entistore-ping".into())
            .spawn(move || {
                let outcome = connection
                    .get()
                    .and_then(|db| Ok(db.run_command(Command::Ping)?));
                // Cleared before replying so the caller's next ping is accepted.
                drop(in_flight);
                let _ = done.send(outcome);
            });
        if let Err(err) = spawned {
            tracing::warn!(error = %err, "failed to start ping");
            return false;
        }

        match result.recv_timeout(self.config.ping_timeout) {
            Ok(Ok(_)) => true,
            Ok(Err(err)) => {
                tracing::trace!(event = "ping", error = %err, "ping failed");
                false
            }
            Err(_) => {
                tracing::trace!(
                    event = "ping",
                    timeout_ms = u64::try_from(self.config.ping_timeout.as_millis()).unwrap_or(u64::MAX),
                    "ping timed out"
                );
                false
            }
        }
    }

    /// Waits until queued audit records have been handed to the sink.
    pub fn flush_audit(&self) {
        if let Some(audit) = &self.audit {
            audit.flush();
        }
    }

    fn audit<T: Entity>(&self, operation: OperationType, entity: &T) {
        if let Some(audit) = &self.audit {
            audit.emit(operation, entity);
        }
    }
}

/// Clears the in-flight flag when the ping thread finishes, even by panic.
struct InFlight(Arc<AtomicBool>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl fmt::Debug for EntityStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityStore")
            .field("database", &self.config.database_name)
            .field("cache", &self.cache)
            .field("audit", &self.audit)
            .finish_non_exhaustive()
    }
}
