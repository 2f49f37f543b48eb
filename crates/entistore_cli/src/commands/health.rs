//! Health command implementation.

use super::CliError;
use entistore_core::{DatabaseHealthCheck, EntityStore, HealthCheck};
use std::sync::Arc;

/// Runs the health command.
pub fn run(store: EntityStore) -> Result<(), CliError> {
    let check = DatabaseHealthCheck::new(Arc::new(store));
    if check.is_healthy() {
        println!("{}: healthy", check.name());
        Ok(())
    } else {
        println!("{}: unhealthy", check.name());
        Err(CliError::Unhealthy)
    }
}
