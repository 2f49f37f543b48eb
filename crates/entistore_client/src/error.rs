//! Error types for document store operations.

use thiserror::Error;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors raised at the document store boundary.
#[derive(Debug, Error)]
pub enum ClientError {
    /// `database()` was called before `connect()`.
    #[error("client is not connected: call connect before requesting a database")]
    NotConnected,

    /// The connection string is malformed or uses an unsupported scheme.
    #[error("invalid connection string {uri:?}: {message}")]
    InvalidUri {
        /// The rejected connection string.
        uri: String,
        /// Why it was rejected.
        message: String,
    },

    /// The server could not be reached.
    #[error("database unreachable: {message}")]
    Unreachable {
        /// Description of the failure.
        message: String,
    },

    /// A document with the same `_id` already exists.
    #[error("duplicate key in collection {collection}: _id {id}")]
    DuplicateKey {
        /// The collection written to.
        collection: String,
        /// Display form of the conflicting identity.
        id: String,
    },

    /// A document without an `_id` field was written.
    #[error("document written to {collection} has no _id field")]
    MissingId {
        /// The collection written to.
        collection: String,
    },

    /// A replacement or update tried to change a document's `_id`.
    #[error("the _id field of a document in {collection} is immutable")]
    ImmutableId {
        /// The collection written to.
        collection: String,
    },

    /// An update operator could not be applied.
    #[error("invalid update: {message}")]
    InvalidUpdate {
        /// Description of the problem.
        message: String,
    },

    /// Index creation failed.
    #[error("failed to create index {index} on {collection}: {message}")]
    IndexCreation {
        /// The collection being indexed.
        collection: String,
        /// Name of the index.
        index: String,
        /// Description of the failure.
        message: String,
    },

    /// A command did not complete.
    #[error("command {command} failed: {message}")]
    CommandFailed {
        /// Name of the command.
        command: String,
        /// Description of the failure.
        message: String,
    },

    /// Document codec error.
    #[error("codec error: {0}")]
    Codec(#[from] entistore_codec::CodecError),
}

impl ClientError {
    /// Creates an unreachable error.
    pub fn unreachable(message: impl Into<String>) -> Self {
        Self::Unreachable {
            message: message.into(),
        }
    }

    /// Creates an invalid update error.
    pub fn invalid_update(message: impl Into<String>) -> Self {
        Self::InvalidUpdate {
            message: message.into(),
        }
    }

    /// Returns true for duplicate `_id` inserts.
    #[must_use]
    pub const fn is_duplicate_key(&self) -> bool {
        matches!(self, Self::DuplicateKey { .. })
    }
}
