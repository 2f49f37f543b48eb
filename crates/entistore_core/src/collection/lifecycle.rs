//! Collection set-up: connection, collection lookup and index reconciliation.

use super::CollectionHandle;
use crate::entity::{declared_indexes, DeclaredIndex, Entity};
use crate::error::{StoreError, StoreResult};
use entistore_client::{
    ClientResult, DocumentClient, DocumentCollection, DocumentDatabase, IndexModel,
};
use parking_lot::Mutex;
use std::sync::Arc;

/// Lazily established, reused database handle.
pub(crate) struct DatabaseConnection {
    client: Arc<dyn DocumentClient>,
    database_name: String,
    database: Mutex<Option<Arc<dyn DocumentDatabase>>>,
}

impl DatabaseConnection {
    pub(crate) fn new(client: Arc<dyn DocumentClient>, database_name: String) -> Self {
        Self {
            client,
            database_name,
            database: Mutex::new(None),
        }
    }

    /// Returns the database, connecting on first use.
    ///
    /// A failed attempt caches nothing.
    pub(crate) fn get(&self) -> StoreResult<Arc<dyn DocumentDatabase>> {
        let mut database = self.database.lock();
        if let Some(db) = database.as_ref() {
            return Ok(Arc::clone(db));
        }
        tracing::trace!(database = %self.database_name, "connecting to database");
        let db = self.client.database(&self.database_name)?;
        *database = Some(Arc::clone(&db));
        Ok(db)
    }
}

/// Fetches `T`'s collection and makes sure its declared indexes exist.
pub(crate) fn open_collection<T: Entity>(
    connection: &DatabaseConnection,
) -> StoreResult<CollectionHandle<T>> {
    let database = connection.get()?;
    tracing::trace!(entity_type = T::NAME, event = "get collection", "opening collection");
    let collection = database.collection(T::NAME)?;

    for index in declared_indexes::<T>() {
        reconcile_index(collection.as_ref(), &index).map_err(|source| {
            StoreError::IndexReconciliation {
                collection: T::NAME.to_string(),
                index: index.name.clone(),
                source,
            }
        })?;
    }
    Ok(CollectionHandle::new(collection))
}

/// Creates `index` unless an existing index already covers its fields.
///
/// Returns true if an index was created.
pub(crate) fn reconcile_index(
    collection: &dyn DocumentCollection,
    index: &DeclaredIndex,
) -> ClientResult<bool> {
    if index_exists(collection, index)? {
        tracing::trace!(
            collection = collection.name(),
            index = %index.name,
            "index already satisfied"
        );
        return Ok(false);
    }

    let model: IndexModel = index.to_model();
    tracing::debug!(
        collection = collection.name(),
        index = %model.name,
        fields = ?model.keys,
        ttl = ?model.expire_after,
        "creating index"
    );
    collection.create_index(model)?;
    Ok(true)
}

fn index_exists(collection: &dyn DocumentCollection, index: &DeclaredIndex) -> ClientResult<bool> {
    // The cursor is dropped (and released) on every return path.
    let mut cursor = collection.list_indexes()?;
    while let Some(batch) = cursor.next_batch()? {
        if batch.iter().any(|existing| existing.covers(&index.fields)) {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{EntityHeader, IndexDeclaration, ObjectId, EXPIRY_INDEX_NAME};
    use entistore_client::{ClientError, Cursor, MemoryClient};
    use serde::{Deserialize, Serialize};
    use std::time::Duration;

    #[derive(Serialize, Deserialize)]
    struct Shipment {
        #[serde(flatten)]
        header: EntityHeader<ObjectId>,
        carrier: String,
        port: String,
    }

    impl Entity for Shipment {
        const NAME: &'static str = "Shipment";
        type Id = ObjectId;

        fn header(&self) -> &EntityHeader<ObjectId> {
            &self.header
        }

        const INDEXES: &'static [IndexDeclaration] = &[
            IndexDeclaration::new("by_route", &["carrier"]),
            IndexDeclaration::new("by_route", &["port"]),
            IndexDeclaration::new("by_port", &["port"]),
        ];
    }

    fn connected() -> (MemoryClient, DatabaseConnection) {
        let client = MemoryClient::new();
        client.connect("memory://lifecycle").unwrap();
        let connection = DatabaseConnection::new(Arc::new(client.clone()), "logistics".into());
        (client, connection)
    }

    fn index_names(collection: &dyn DocumentCollection) -> Vec<String> {
        let mut cursor: Box<dyn Cursor<IndexModel>> = collection.list_indexes().unwrap();
        let mut names = Vec::new();
        while let Some(batch) = cursor.next_batch().unwrap() {
            names.extend(batch.into_iter().map(|i| i.name));
        }
        names
    }

    #[test]
    fn creates_expiry_and_declared_indexes() {
        let (client, connection) = connected();
        let handle = open_collection::<Shipment>(&connection).unwrap();

        // by_port is covered by by_route (carrier, port).
        assert_eq!(
            index_names(handle.raw().as_ref()),
            vec!["_id_", EXPIRY_INDEX_NAME, "by_route"]
        );
        assert_eq!(client.stats().index_creations(), 2);
        assert_eq!(client.stats().open_cursors(), 0);
    }

    #[test]
    fn expiry_index_has_zero_ttl() {
        let (_client, connection) = connected();
        let handle = open_collection::<Shipment>(&connection).unwrap();
        let mut cursor = handle.raw().list_indexes().unwrap();
        let indexes = cursor.next_batch().unwrap().unwrap();
        let expiry = indexes
            .iter()
            .find(|i| i.name == EXPIRY_INDEX_NAME)
            .unwrap();
        assert_eq!(expiry.expire_after, Some(Duration::ZERO));
    }

    #[test]
    fn existing_superset_index_is_reused() {
        let (client, connection) = connected();
        let db = connection.get().unwrap();
        let raw = db.collection("Shipment").unwrap();
        raw.create_index(IndexModel::new(
            "legacy",
            vec!["port".into(), "carrier".into(), "eta".into()],
        ))
        .unwrap();
        let before = client.stats().index_creations();

        open_collection::<Shipment>(&connection).unwrap();
        assert_eq!(client.stats().index_creations() - before, 1);
    }

    #[test]
    fn second_open_creates_nothing() {
        let (client, connection) = connected();
        open_collection::<Shipment>(&connection).unwrap();
        let created = client.stats().index_creations();
        open_collection::<Shipment>(&connection).unwrap();
        assert_eq!(client.stats().index_creations(), created);
    }

    #[test]
    fn index_failure_names_the_index() {
        let (client, connection) = connected();
        client.fail_index_creation(true);
        let err = open_collection::<Shipment>(&connection).unwrap_err();
        match err {
            StoreError::IndexReconciliation {
                collection,
                index,
                source,
            } => {
                assert_eq!(collection, "Shipment");
                assert_eq!(index, EXPIRY_INDEX_NAME);
                assert!(matches!(source, ClientError::IndexCreation { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn connection_is_lazy_and_retried() {
        let client = MemoryClient::new();
        let connection = DatabaseConnection::new(Arc::new(client.clone()), "db".into());
        assert!(connection.get().is_err());

        client.connect("memory://late").unwrap();
        let first = connection.get().unwrap();
        let second = connection.get().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }
}
