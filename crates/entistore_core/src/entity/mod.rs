//! Entity model.
//!
//! An entity is a serde type that embeds an [`EntityHeader`] and implements
//! [`Entity`]:
//!
//! ```
//! use entistore_core::{Entity, EntityHeader, Guid, IndexDeclaration};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
//! struct Invoice {
//!     #[serde(flatten)]
//!     header: EntityHeader<Guid>,
//!     customer: String,
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
//!
//!     const INDEXES: &'static [IndexDeclaration] =
//!         &[IndexDeclaration::new("by_customer", &["customer"])];
//! }
//! ```

mod header;
mod id;
mod index;

pub use header::{
    EntityHeader, Timestamp, CREATED_AT_FIELD, DEFAULT_RETENTION_MONTHS, EXPIRES_AT_FIELD,
    ID_FIELD,
};
pub use id::{EntityKey, Guid, IdStrategy, ObjectId, ParseIdError, SequenceId, SEQUENCE_EPOCH_MILLIS};
pub use index::{declared_indexes, DeclaredIndex, IndexDeclaration, EXPIRY_INDEX_NAME};

use serde::de::DeserializeOwned;
use serde::Serialize;

/// A typed record persisted in its own collection.
pub trait Entity: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Collection name; by convention the type's name.
    const NAME: &'static str;

    /// Identity type, which fixes the identity strategy.
    type Id: EntityKey;

    /// The embedded identity and lifetime fields.
    fn header(&self) -> &EntityHeader<Self::Id>;

    /// Index declarations of this type.
    const INDEXES: &'static [IndexDeclaration] = &[];

    /// The entity's identity.
    fn id(&self) -> &Self::Id {
        self.header().id()
    }
}
