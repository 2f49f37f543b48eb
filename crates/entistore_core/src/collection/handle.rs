//! Typed collection handles.

use crate::entity::Entity;
use crate::error::StoreResult;
use entistore_client::DocumentCollection;
use entistore_codec::{from_document, to_document, Document};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// The live binding between an entity type and its store collection.
///
/// Handles are cheap to clone; every clone refers to the same collection.
/// The store hands them out from its [`CollectionCache`](super::CollectionCache)
/// once the collection's indexes have been reconciled.
pub struct CollectionHandle<T> {
    collection: Arc<dyn DocumentCollection>,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> CollectionHandle<T> {
    pub(crate) fn new(collection: Arc<dyn DocumentCollection>) -> Self {
        Self {
            collection,
            _entity: PhantomData,
        }
    }

    /// Collection name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.collection.name()
    }

    /// The untyped collection, for queries the typed surface does not cover.
    #[must_use]
    pub fn raw(&self) -> &Arc<dyn DocumentCollection> {
        &self.collection
    }

    /// Converts an entity to its stored document.
    ///
    /// # Errors
    ///
    /// Returns a codec error if the entity cannot be serialized.
    pub fn encode(&self, entity: &T) -> StoreResult<Document> {
        Ok(to_document(entity)?)
    }

    /// Converts a stored document back to an entity.
    ///
    /// # Errors
    ///
    /// Returns a codec error if the document does not fit `T`.
    pub fn decode(&self, document: &Document) -> StoreResult<T> {
        Ok(from_document(document)?)
    }
}

impl<T> Clone for CollectionHandle<T> {
    fn clone(&self) -> Self {
        Self {
            collection: Arc::clone(&self.collection),
            _entity: PhantomData,
        }
    }
}

impl<T> fmt::Debug for CollectionHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionHandle")
            .field("collection", &self.collection.name())
            .finish()
    }
}
