//! # entistore client
//!
//! Document database boundary for entistore.
//!
//! This crate defines:
//! - The [`DocumentClient`] / [`DocumentDatabase`] / [`DocumentCollection`]
//!   traits every driver implements
//! - The native query language: [`Filter`], [`Update`], [`Collation`],
//!   [`IndexModel`]
//! - [`MemoryClient`], an in-memory driver with fault injection for tests
//!
//! Nothing here knows about typed entities; that is `entistore_core`.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod memory;
mod query;
mod traits;

pub use error::{ClientError, ClientResult};
pub use memory::{
    MemoryClient, MemoryCollection, MemoryDatabase, MemoryStats, DEFAULT_BATCH_SIZE,
    MEMORY_SCHEME,
};
pub use query::{
    Collation, Command, Comparison, Filter, IndexModel, QueryOptions, Update, UpdateOp,
    UpdateResult, ID_FIELD, ID_INDEX_NAME,
};
pub use traits::{Cursor, DocumentClient, DocumentCollection, DocumentDatabase};
