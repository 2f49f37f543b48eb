//! Per-type cache of collection handles.

use super::CollectionHandle;
use crate::entity::Entity;
use crate::error::{StoreError, StoreResult};
use parking_lot::Mutex;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

type Slot = Arc<Mutex<Option<Arc<dyn Any + Send + Sync>>>>;

/// Cache of reconciled collection handles, keyed by entity type.
///
/// Each type has its own slot. The map lock is held only long enough to
/// find or create a slot; the slot lock spans the whole "check, set up,
/// insert" sequence. Concurrent first uses of one type therefore run set-up
/// exactly once, while different types set up in parallel.
///
/// A failed set-up leaves the slot empty, so the next call starts over.
///
/// The cache is an ordinary value: share it between stores with `Arc` or
/// give each test its own. Handles belong to one database, so the first
/// store built with a cache binds it to its URI and database name, and
/// stores pointing anywhere else are refused.
#[derive(Default)]
pub struct CollectionCache {
    slots: Mutex<HashMap<TypeId, Slot>>,
    scope: Mutex<Option<(String, String)>>,
}

impl CollectionCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds the cache to `database` at `uri`, or checks an earlier binding.
    pub(crate) fn bind(&self, uri: &str, database: &str) -> StoreResult<()> {
        let mut scope = self.scope.lock();
        match scope.as_ref() {
            None => {
                *scope = Some((uri.to_string(), database.to_string()));
                Ok(())
            }
            Some((bound_uri, bound_db)) if bound_uri == uri && bound_db == database => Ok(()),
            Some((bound_uri, bound_db)) => Err(StoreError::config(format!(
                "collection cache belongs to database {bound_db:?} at {bound_uri}, \
                 not {database:?} at {uri}"
            ))),
        }
    }

    fn slot<T: Entity>(&self) -> Slot {
        let mut slots = self.slots.lock();
        Arc::clone(slots.entry(TypeId::of::<T>()).or_default())
    }

    fn existing_slot<T: Entity>(&self) -> Option<Slot> {
        self.slots.lock().get(&TypeId::of::<T>()).cloned()
    }

    /// Returns the cached handle for `T`, running `init` on a miss.
    ///
    /// # Errors
    ///
    /// Returns whatever `init` returns; nothing is cached in that case.
    pub fn get_or_init<T, F>(&self, init: F) -> StoreResult<CollectionHandle<T>>
    where
        T: Entity,
        F: FnOnce() -> StoreResult<CollectionHandle<T>>,
    {
        let slot = self.slot::<T>();
        let mut entry = slot.lock();

        if let Some(handle) = entry
            .as_ref()
            .and_then(|cached| cached.downcast_ref::<CollectionHandle<T>>())
        {
            return Ok(handle.clone());
        }

        tracing::trace!(entity_type = T::NAME, "collection not cached, setting up");
        let handle = init()?;
        *entry = Some(Arc::new(handle.clone()));
        Ok(handle)
    }

    /// Returns the cached handle for `T` without setting anything up.
    #[must_use]
    pub fn get<T: Entity>(&self) -> Option<CollectionHandle<T>> {
        let slot = self.existing_slot::<T>()?;
        let entry = slot.lock();
        entry
            .as_ref()
            .and_then(|cached| cached.downcast_ref::<CollectionHandle<T>>())
            .cloned()
    }

    /// Whether a handle for `T` is cached.
    #[must_use]
    pub fn contains<T: Entity>(&self) -> bool {
        self.existing_slot::<T>()
            .is_some_and(|slot| slot.lock().is_some())
    }

    /// Forgets the handle for `T`; the next use sets the collection up again.
    ///
    /// Returns true if a handle was cached.
    pub fn invalidate<T: Entity>(&self) -> bool {
        match self.existing_slot::<T>() {
            Some(slot) => slot.lock().take().is_some(),
            None => false,
        }
    }

    /// Forgets every cached handle.
    pub fn clear(&self) {
        let slots: Vec<Slot> = self.slots.lock().values().cloned().collect();
        for slot in slots {
            slot.lock().take();
        }
    }

    /// Number of cached handles.
    #[must_use]
    pub fn len(&self) -> usize {
        let slots: Vec<Slot> = self.slots.lock().values().cloned().collect();
        slots.iter().filter(|slot| slot.lock().is_some()).count()
    }

    /// Whether no handle is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for CollectionCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionCache")
            .field("database", &self.scope.lock().as_ref().map(|(_, db)| db.clone()))
            .field("cached", &self.len())
            .finish()
    }
}
