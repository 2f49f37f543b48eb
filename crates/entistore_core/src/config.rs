//! Store configuration.

use crate::error::{StoreError, StoreResult};
use std::time::Duration;

/// Environment variable holding the connection string.
pub const ENV_DATABASE_URI: &str = "ENTISTORE_DATABASE_URI";
/// Environment variable holding the database name.
pub const ENV_DATABASE_NAME: &str = "ENTISTORE_DATABASE_NAME";
/// Environment variable holding the audit stream name.
pub const ENV_AUDIT_STREAM: &str = "ENTISTORE_AUDIT_STREAM";
/// Environment variable holding the service name used in audit envelopes.
pub const ENV_SERVICE_NAME: &str = "ENTISTORE_SERVICE_NAME";
/// Environment variable holding the ping timeout in milliseconds.
pub const ENV_PING_TIMEOUT_MS: &str = "ENTISTORE_PING_TIMEOUT_MS";

/// Configuration for an [`EntityStore`](crate::EntityStore).
///
/// Values are read once when the store is built; changing the environment
/// afterwards has no effect on a running store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Connection string passed to the document client.
    pub database_uri: String,

    /// Name of the database holding entity collections.
    pub database_name: String,

    /// Stream receiving audit envelopes. `None` disables auditing.
    pub audit_stream_name: Option<String>,

    /// Service name written into audit envelopes.
    pub service_name: String,

    /// Upper bound on a `ping` round trip.
    pub ping_timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_uri: String::new(),
            database_name: String::new(),
            audit_stream_name: None,
            service_name: "entistore".to_string(),
            ping_timeout: Duration::from_secs(1),
        }
    }
}

impl StoreConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the connection string.
    #[must_use]
    pub fn database_uri(mut self, uri: impl Into<String>) -> Self {
        self.database_uri = uri.into();
        self
    }

    /// Sets the database name.
    #[must_use]
    pub fn database_name(mut self, name: impl Into<String>) -> Self {
        self.database_name = name.into();
        self
    }

    /// Enables auditing to the given stream.
    #[must_use]
    pub fn audit_stream_name(mut self, stream: impl Into<String>) -> Self {
        self.audit_stream_name = Some(stream.into());
        self
    }

    /// Sets the service name used in audit envelopes.
    #[must_use]
    pub fn service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = name.into();
        self
    }

    /// Sets the ping timeout.
    #[must_use]
    pub fn ping_timeout(mut self, timeout: Duration) -> Self {
        self.ping_timeout = timeout;
        self
    }

    /// Reads configuration from `ENTISTORE_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Config` if `ENTISTORE_PING_TIMEOUT_MS` is not a number.
    pub fn from_env() -> StoreResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through an arbitrary key lookup.
    ///
    /// Missing keys keep their defaults; empty values count as missing.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Config` if the ping timeout is not a number.
    pub fn from_lookup<F>(lookup: F) -> StoreResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(uri) = get(ENV_DATABASE_URI) {
            config.database_uri = uri;
        }
        if let Some(name) = get(ENV_DATABASE_NAME) {
            config.database_name = name;
        }
        config.audit_stream_name = get(ENV_AUDIT_STREAM);
        if let Some(service) = get(ENV_SERVICE_NAME) {
            config.service_name = service;
        }
        if let Some(raw) = get(ENV_PING_TIMEOUT_MS) {
            let millis: u64 = raw.trim().parse().map_err(|_| {
                StoreError::config(format!("{ENV_PING_TIMEOUT_MS} is not a number: {raw:?}"))
            })?;
            config.ping_timeout = Duration::from_millis(millis);
        }
        Ok(config)
    }

    /// Checks that the required connection settings are present.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Config` naming the first missing setting.
    pub fn validate(&self) -> StoreResult<()> {
        if self.database_uri.trim().is_empty() {
            return Err(StoreError::config("database_uri is required"));
        }
        if self.database_name.trim().is_empty() {
            return Err(StoreError::config("database_name is required"));
        }
        if self.ping_timeout.is_zero() {
            return Err(StoreError::config("ping_timeout must be greater than zero"));
        }
        Ok(())
    }

    /// Whether writes are forwarded to an audit stream.
    #[must_use]
    pub fn audit_enabled(&self) -> bool {
        self.audit_stream_name.is_some()
    }
}
