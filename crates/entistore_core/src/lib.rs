//! # entistore core
//!
//! Typed entity persistence over a document database.
//!
//! This crate provides:
//! - The entity model: [`Entity`], [`EntityHeader`], three identity strategies
//!   and index declarations
//! - Typed predicates that combine, evaluate in process and translate to
//!   store filters
//! - The collection lifecycle: lazy set-up, index reconciliation and a
//!   per-type [`CollectionCache`]
//! - [`EntityStore`]: count, distinct, get, find, put, update, remove, drop
//!   and ping
//! - Optional audit export of writes
//!
//! ## Example
//!
//! ```
//! use entistore_client::MemoryClient;
//! use entistore_core::predicate::Predicate;
//! use entistore_core::{Entity, EntityHeader, EntityStore, Guid, StoreConfig};
//! use serde::{Deserialize, Serialize};
//! use std::sync::Arc;
//!
//! #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
//! struct Invoice {
//!     #[serde(flatten)]
//!     header: EntityHeader<Guid>,
//!     total: i64,
//! }
//!
//! impl Entity for Invoice {
//!     const NAME: &'static str = "Invoice";
//!     type Id = Guid;
//!
//!     fn header(&self) -> &EntityHeader<Guid> {
//!         &self.header
//!     }
//! }
//!
//! let config = StoreConfig::new()
//!     .database_uri("memory://docs")
//!     .database_name("billing");
//! let store = EntityStore::builder(config)
//!     .client(Arc::new(MemoryClient::new()))
//!     .build()?;
//!
//! let invoice = Invoice { header: EntityHeader::new(), total: 120 };
//! store.put(&invoice)?;
//!
//! let large = Predicate::<Invoice>::new(|i| i.field("total").gt(100));
//! assert_eq!(store.find_list(&large, None)?, vec![invoice]);
//! # Ok::<(), entistore_core::StoreError>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod audit;
pub mod collection;
mod config;
mod cursor;
pub mod entity;
mod error;
pub mod health;
pub mod predicate;
pub mod registry;
mod store;

pub use audit::{AuditEmitter, AuditError, AuditSink, OperationType, TracingSink, WriteEnvelope};
pub use collection::{CollectionCache, CollectionHandle};
pub use config::StoreConfig;
pub use cursor::{Distinct, EntityCursor};
pub use entity::{
    Entity, EntityHeader, EntityKey, Guid, IdStrategy, IndexDeclaration, ObjectId, SequenceId,
    Timestamp,
};
pub use error::{StoreError, StoreResult};
pub use health::{DatabaseHealthCheck, HealthCheck};
pub use predicate::{Predicate, PredicateError};
pub use registry::{EntityRegistry, StartupReport};
pub use store::{EntityStore, EntityStoreBuilder};
