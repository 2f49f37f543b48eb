//! Error types for entistore core.

use crate::audit::AuditError;
use crate::predicate::PredicateError;
use entistore_client::ClientError;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in entity store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store was configured without required settings.
    #[error("configuration error: {message}")]
    Config {
        /// Description of the problem.
        message: String,
    },

    /// Document store error (connectivity, duplicate keys, ...).
    #[error("client error: {0}")]
    Client(#[from] ClientError),

    /// Entity could not be converted to or from a document.
    #[error("codec error: {0}")]
    Codec(#[from] entistore_codec::CodecError),

    /// A predicate could not be translated to a filter.
    #[error("predicate error: {0}")]
    Predicate(#[from] PredicateError),

    /// The audit exporter could not be started.
    #[error("audit error: {0}")]
    Audit(#[from] AuditError),

    /// Listing or creating a declared index failed during collection setup.
    #[error("failed to reconcile index {index} on {collection}: {source}")]
    IndexReconciliation {
        /// The collection being set up.
        collection: String,
        /// The declared index.
        index: String,
        /// The underlying failure.
        #[source]
        source: ClientError,
    },
}

impl StoreError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Returns true if the store could not be reached.
    #[must_use]
    pub fn is_unreachable(&self) -> bool {
        matches!(
            self,
            Self::Client(ClientError::Unreachable { .. } | ClientError::NotConnected)
                | Self::IndexReconciliation {
                    source: ClientError::Unreachable { .. },
                    ..
                }
        )
    }
}
