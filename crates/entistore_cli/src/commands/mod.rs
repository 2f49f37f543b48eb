//! CLI command implementations.

pub mod demo;
pub mod health;
pub mod indexes;
mod model;

use entistore_client::{MemoryClient, MEMORY_SCHEME};
use entistore_core::{EntityStore, StoreConfig, StoreError, TracingSink};
use std::sync::Arc;
use thiserror::Error;

/// Errors reported by CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// No driver is available for the connection string.
    #[error("unsupported connection string {0:?}: only {MEMORY_SCHEME} URIs are supported")]
    UnsupportedUri(String),

    /// The database did not answer the health check.
    #[error("database is unhealthy")]
    Unhealthy,

    /// A store operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Output could not be rendered.
    #[error("failed to render output: {0}")]
    Output(#[from] serde_json::Error),
}

/// Resolves the configuration and builds a store.
///
/// Command-line values override the environment. Audit records, when a
/// stream is configured, go to the log.
pub fn open_store(uri: Option<String>, database: Option<String>) -> Result<EntityStore, CliError> {
    let mut config = StoreConfig::from_env()?;
    if let Some(uri) = uri {
        config.database_uri = uri;
    }
    if let Some(database) = database {
        config.database_name = database;
    }
    if config.database_uri.is_empty() {
        config.database_uri = format!("{MEMORY_SCHEME}entistore");
    }
    if config.database_name.is_empty() {
        config.database_name = "entistore".to_string();
    }
    if !config.database_uri.starts_with(MEMORY_SCHEME) {
        return Err(CliError::UnsupportedUri(config.database_uri));
    }

    tracing::debug!(
        uri = %config.database_uri,
        database = %config.database_name,
        audit = ?config.audit_stream_name,
        "opening store"
    );

    Ok(EntityStore::builder(config)
        .client(Arc::new(MemoryClient::new()))
        .audit_sink(Arc::new(TracingSink))
        .build()?)
}
