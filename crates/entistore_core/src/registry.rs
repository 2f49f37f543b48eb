//! Startup registration of entity types.

use crate::entity::Entity;
use crate::error::{StoreError, StoreResult};
use crate::store::EntityStore;
use std::any::TypeId;
use std::fmt;

type Warm = fn(&EntityStore) -> StoreResult<()>;

struct Registration {
    type_id: TypeId,
    name: &'static str,
    warm: Warm,
}

fn warm<T: Entity>(store: &EntityStore) -> StoreResult<()> {
    store.collection::<T>().map(|_| ())
}

/// The set of entity types to set up when the service starts.
///
/// ```
/// # use entistore_core::{Entity, EntityHeader, Guid};
/// # use entistore_core::registry::EntityRegistry;
/// # use serde::{Deserialize, Serialize};
/// # #[derive(Serialize, Deserialize)]
/// # struct Invoice { #[serde(flatten)] header: EntityHeader<Guid> }
/// # impl Entity for Invoice {
/// #     const NAME: &'static str = "Invoice";
/// #     type Id = Guid;
/// #     fn header(&self) -> &EntityHeader<Guid> { &self.header }
/// # }
/// let registry = EntityRegistry::new().register::<Invoice>().register::<Invoice>();
/// assert_eq!(registry.len(), 1);
/// assert_eq!(registry.names(), vec!["Invoice"]);
/// ```
#[derive(Default)]
pub struct EntityRegistry {
    entries: Vec<Registration>,
}

impl EntityRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `T`. Registering a type twice has no effect.
    #[must_use]
    pub fn register<T: Entity>(mut self) -> Self {
        let type_id = TypeId::of::<T>();
        if !self.entries.iter().any(|e| e.type_id == type_id) {
            self.entries.push(Registration {
                type_id,
                name: T::NAME,
                warm: warm::<T>,
            });
        }
        self
    }

    /// Registered type names, in registration order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.entries.iter().map(|e| e.name).collect()
    }

    /// Number of registered types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn warm(&self, store: &EntityStore) -> StartupReport {
        let mut report = StartupReport::default();
        for entry in &self.entries {
            match (entry.warm)(store) {
                Ok(()) => report.ready.push(entry.name),
                Err(err) => report.failed.push((entry.name, err)),
            }
        }
        report
    }
}

impl fmt::Debug for EntityRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// Outcome of [`EntityStore::start`].
#[derive(Debug, Default)]
pub struct StartupReport {
    /// Types whose collections are set up and cached.
    pub ready: Vec<&'static str>,
    /// Types whose set-up failed, with the error.
    pub failed: Vec<(&'static str, StoreError)>,
}

impl StartupReport {
    /// Whether every registered type was set up.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}
