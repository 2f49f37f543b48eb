//! Index declarations.

use super::header::EXPIRES_AT_FIELD;
use super::Entity;
use entistore_client::IndexModel;
use std::time::Duration;

/// Name of the TTL index every collection carries.
pub const EXPIRY_INDEX_NAME: &str = "expires_at";

/// A named index over one or more fields of an entity type.
///
/// Several declarations may share a name; they are merged into one
/// composite index in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexDeclaration {
    /// Index name.
    pub name: &'static str,
    /// Stored field names (dotted paths for nested fields).
    pub fields: &'static [&'static str],
}

impl IndexDeclaration {
    /// Declares an index.
    #[must_use]
    pub const fn new(name: &'static str, fields: &'static [&'static str]) -> Self {
        Self { name, fields }
    }
}

/// An index resolved from an entity type's declarations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredIndex {
    /// Index name.
    pub name: String,
    /// Key fields, without duplicates, in declaration order.
    pub fields: Vec<String>,
    /// TTL of the index, if it is an expiry index.
    pub expire_after: Option<Duration>,
}

impl DeclaredIndex {
    /// The store-level definition used to create this index.
    #[must_use]
    pub fn to_model(&self) -> IndexModel {
        let model = IndexModel::new(self.name.clone(), self.fields.clone());
        match self.expire_after {
            Some(ttl) => model.expire_after(ttl),
            None => model,
        }
    }
}

/// The full index set of an entity type.
///
/// Always starts with the `expires_at` TTL index (zero expiry: documents
/// expire exactly at their `expires_at`), followed by the type's own
/// declarations merged by name.
#[must_use]
pub fn declared_indexes<T: Entity>() -> Vec<DeclaredIndex> {
    merge_declarations(T::INDEXES)
}

pub(crate) fn merge_declarations(declarations: &[IndexDeclaration]) -> Vec<DeclaredIndex> {
    let mut indexes = vec![DeclaredIndex {
        name: EXPIRY_INDEX_NAME.to_string(),
        fields: vec![EXPIRES_AT_FIELD.to_string()],
        expire_after: Some(Duration::ZERO),
    }];

    for declaration in declarations {
        let position = match indexes.iter().position(|i| i.name == declaration.name) {
            Some(position) => position,
            None => {
                indexes.push(DeclaredIndex {
                    name: declaration.name.to_string(),
                    fields: Vec::new(),
                    expire_after: None,
                });
                indexes.len() - 1
            }
        };
        let fields = &mut indexes[position].fields;
        for field in declaration.fields {
            if !fields.iter().any(|f| f == field) {
                fields.push((*field).to_string());
            }
        }
    }

    indexes.retain(|index| !index.fields.is_empty());
    indexes
}
