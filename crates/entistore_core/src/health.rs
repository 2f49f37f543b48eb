//! Health checks.

use crate::store::EntityStore;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// A boolean check polled by an external health-check framework.
pub trait HealthCheck: Send + Sync {
    /// Name reported alongside the result.
    fn name(&self) -> &str;

    /// Whether the dependency is usable. Never panics.
    fn is_healthy(&self) -> bool;
}

/// Reports whether the store's database answers a ping in time.
#[derive(Debug, Clone)]
pub struct DatabaseHealthCheck {
    store: Arc<EntityStore>,
}

impl DatabaseHealthCheck {
    /// Wraps a store.
    #[must_use]
    pub fn new(store: Arc<EntityStore>) -> Self {
        Self { store }
    }
}

impl HealthCheck for DatabaseHealthCheck {
    fn name(&self) -> &str {
        "database"
    }

    fn is_healthy(&self) -> bool {
        match catch_unwind(AssertUnwindSafe(|| self.store.ping())) {
            Ok(true) => true,
            Ok(false) => {
                tracing::error!(
                    check = self.name(),
                    database = %self.store.config().database_name,
                    "database ping failed"
                );
                false
            }
            Err(_) => {
                tracing::error!(check = self.name(), "database ping panicked");
                false
            }
        }
    }
}
