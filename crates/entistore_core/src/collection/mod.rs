//! Collection lifecycle.
//!
//! On the first use of an entity type the store:
//! 1. connects to the database (once, then reuses it)
//! 2. fetches the collection named after the type
//! 3. reconciles the type's declared indexes plus the `expires_at` TTL index
//! 4. caches the resulting handle in a [`CollectionCache`]
//!
//! Later uses return the cached handle without touching the store.

mod cache;
mod handle;
mod lifecycle;

pub use cache::CollectionCache;
pub use handle::CollectionHandle;

pub(crate) use lifecycle::{open_collection, DatabaseConnection};
