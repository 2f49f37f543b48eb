//! Document store boundary traits.
//!
//! These traits are the only way the entity layer talks to a document
//! database. A network driver and the in-memory store both sit behind them.

use crate::error::ClientResult;
use crate::query::{Command, Filter, IndexModel, QueryOptions, Update, UpdateResult};
use entistore_codec::{Document, Value};
use std::sync::Arc;

/// Entry point to a document database server.
///
/// # Invariants
///
/// - `connect` must succeed before `database` is called
/// - Returned handles are cheap to clone and safe to share across threads
pub trait DocumentClient: Send + Sync {
    /// Prepares the client for the given connection string.
    ///
    /// # Errors
    ///
    /// Returns `InvalidUri` if the connection string cannot be used.
    fn connect(&self, uri: &str) -> ClientResult<()>;

    /// Returns a handle to a named database.
    ///
    /// # Errors
    ///
    /// Returns `NotConnected` before `connect`, or `Unreachable` if the
    /// server cannot be contacted.
    fn database(&self, name: &str) -> ClientResult<Arc<dyn DocumentDatabase>>;
}

/// A database: a namespace of collections.
pub trait DocumentDatabase: Send + Sync {
    /// Database name.
    fn name(&self) -> &str;

    /// Returns the named collection, creating it if it does not exist.
    fn collection(&self, name: &str) -> ClientResult<Arc<dyn DocumentCollection>>;

    /// Destroys a collection with all its documents and indexes.
    ///
    /// Dropping a collection that does not exist is not an error.
    fn drop_collection(&self, name: &str) -> ClientResult<()>;

    /// Names of existing collections.
    fn list_collection_names(&self) -> ClientResult<Vec<String>>;

    /// Runs an administrative command and returns its reply.
    fn run_command(&self, command: Command) -> ClientResult<Document>;
}

/// A collection of documents.
///
/// Every write is atomic per document. `find_one_and_replace` is atomic as a
/// whole: no other write to the matched document can interleave.
pub trait DocumentCollection: Send + Sync {
    /// Collection name.
    fn name(&self) -> &str;

    /// Lists the indexes currently defined.
    fn list_indexes(&self) -> ClientResult<Box<dyn Cursor<IndexModel>>>;

    /// Creates an index, returning its name.
    ///
    /// Creating an index that already exists with the same keys is a no-op.
    fn create_index(&self, model: IndexModel) -> ClientResult<String>;

    /// Counts matching documents.
    fn count(&self, filter: &Filter, options: &QueryOptions) -> ClientResult<u64>;

    /// Distinct values of a field over matching documents.
    fn distinct(
        &self,
        field: &str,
        filter: &Filter,
        options: &QueryOptions,
    ) -> ClientResult<Box<dyn Cursor<Value>>>;

    /// Matching documents, in natural order.
    fn find(&self, filter: &Filter, options: &QueryOptions)
        -> ClientResult<Box<dyn Cursor<Document>>>;

    /// Inserts a new document.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateKey` if a document with the same `_id` exists.
    fn insert_one(&self, document: Document) -> ClientResult<()>;

    /// Replaces the first matching document, returning the replaced one.
    ///
    /// Returns `Ok(None)` and writes nothing if no document matches.
    fn find_one_and_replace(
        &self,
        filter: &Filter,
        replacement: Document,
    ) -> ClientResult<Option<Document>>;

    /// Applies an update to every matching document.
    fn update_many(
        &self,
        filter: &Filter,
        update: &Update,
        options: &QueryOptions,
    ) -> ClientResult<UpdateResult>;

    /// Deletes the first matching document; returns the number deleted.
    fn delete_one(&self, filter: &Filter) -> ClientResult<u64>;

    /// Deletes every matching document; returns the number deleted.
    fn delete_many(&self, filter: &Filter, options: &QueryOptions) -> ClientResult<u64>;
}

/// A forward-only result cursor.
///
/// Server-side resources are released when the cursor is dropped, whether
/// or not it was exhausted.
pub trait Cursor<T>: Send {
    /// Fetches the next batch, or `None` once the cursor is exhausted.
    fn next_batch(&mut self) -> ClientResult<Option<Vec<T>>>;
}
