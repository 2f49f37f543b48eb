//! Test fixtures and store helpers.
//!
//! Every fixture gets its own [`MemoryClient`] and [`CollectionCache`], so
//! tests never share state.

use crate::sinks::RecordingSink;
use entistore_client::MemoryClient;
use entistore_core::{AuditSink, CollectionCache, EntityStore, StoreConfig};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Audit stream used by audited fixtures.
pub const TEST_AUDIT_STREAM: &str = "entistore-test-audit";

static NEXT_DATABASE: AtomicUsize = AtomicUsize::new(0);

/// A configuration pointing at a fresh in-memory database.
pub fn test_config() -> StoreConfig {
    let n = NEXT_DATABASE.fetch_add(1, Ordering::Relaxed);
    StoreConfig::new()
        .database_uri(format!("memory://test-{n}"))
        .database_name(format!("test_{n}"))
        .service_name("entistore-tests")
}

/// An entity store over an in-memory database, with access to the
/// client's fault injection and counters.
pub struct TestStore {
    /// The in-memory client behind the store.
    pub client: MemoryClient,
    /// Records audit envelopes (empty unless built with [`TestStore::audited`]).
    pub sink: Arc<RecordingSink>,
    store: Arc<EntityStore>,
}

impl TestStore {
    /// Creates a store without audit.
    pub fn memory() -> Self {
        Self::build(test_config(), None)
    }

    /// Creates a store that audits into [`TestStore::sink`].
    pub fn audited() -> Self {
        Self::build(test_config().audit_stream_name(TEST_AUDIT_STREAM), None)
    }

    /// Creates a store with a custom configuration.
    ///
    /// The configuration's URI must use the `memory://` scheme.
    pub fn with_config(config: StoreConfig) -> Self {
        Self::build(config, None)
    }

    /// Creates an audited store publishing to `sink`.
    pub fn with_sink(sink: Arc<dyn AuditSink>) -> Self {
        Self::build(
            test_config().audit_stream_name(TEST_AUDIT_STREAM),
            Some(sink),
        )
    }

    fn build(config: StoreConfig, sink: Option<Arc<dyn AuditSink>>) -> Self {
        let client = MemoryClient::new();
        let recording = Arc::new(RecordingSink::new());
        let sink = sink.unwrap_or_else(|| recording.clone() as Arc<dyn AuditSink>);

        let store = EntityStore::builder(config)
            .client(Arc::new(client.clone()))
            .cache(Arc::new(CollectionCache::new()))
            .audit_sink(sink)
            .build()
            .expect("failed to build test store");

        Self {
            client,
            sink: recording,
            store: Arc::new(store),
        }
    }

    /// A shared handle to the store, for moving into threads.
    pub fn shared(&self) -> Arc<EntityStore> {
        Arc::clone(&self.store)
    }

    /// Waits for queued audit records to reach the sink.
    pub fn settle(&self) {
        self.store.flush_audit();
    }
}

impl std::ops::Deref for TestStore {
    type Target = EntityStore;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

/// Runs a test with a fresh in-memory store.
///
/// # Example
///
/// ```rust,ignore
/// use entistore_testkit::{with_test_store, Customer};
///
/// #[test]
/// fn my_test() {
///     with_test_store(|store| {
///         store.put(&Customer::new("Amani", "amani@example.com")).unwrap();
///     });
/// }
/// ```
pub fn with_test_store<F, R>(f: F) -> R
where
    F: FnOnce(&TestStore) -> R,
{
    let store = TestStore::memory();
    f(&store)
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;
    use crate::entities::Customer;

    /// Creates a store holding `count` customers with tiers cycling 0..=3.
    pub fn populated_store(count: usize) -> TestStore {
        let store = TestStore::memory();
        for i in 0..count {
            let tier = i64::try_from(i % 4).unwrap_or_default();
            let customer =
                Customer::new(format!("customer-{i}"), format!("c{i}@example.com")).tier(tier);
            store.put(&customer).expect("failed to populate test store");
        }
        store
    }
}
