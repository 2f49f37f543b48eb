//! Demo command implementation.

use super::model::{registry, Order, OrderEvent};
use super::CliError;
use entistore_client::{Collation, Update};
use entistore_core::predicate::Predicate;
use entistore_core::{EntityStore, StoreResult};
use serde::Serialize;

const CUSTOMERS: [&str; 4] = ["amani", "Baraka", "AMANI", "neema"];

/// What the demo did.
#[derive(Debug, Default, Serialize, PartialEq, Eq)]
pub struct DemoSummary {
    /// Orders written.
    pub written: u64,
    /// Orders with a total above 500.
    pub large: u64,
    /// Orders of customer "amani", compared case-insensitively.
    pub amani: u64,
    /// Distinct customers, compared case-insensitively.
    pub customers: usize,
    /// Orders closed by the bulk update.
    pub closed: u64,
    /// Orders removed at the end.
    pub removed: u64,
}

/// Runs the demo command.
pub fn run(store: &EntityStore, count: usize) -> Result<(), CliError> {
    let summary = demo(store, count)?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn demo(store: &EntityStore, count: usize) -> StoreResult<DemoSummary> {
    let report = store.start(&registry());
    tracing::info!(ready = ?report.ready, failed = report.failed.len(), "collections ready");

    let mut summary = DemoSummary::default();
    for i in 0..count {
        let total = i64::try_from(i * 137 % 1000).unwrap_or_default();
        let order = Order::new(CUSTOMERS[i % CUSTOMERS.len()], total);
        store.put(&order)?;
        store.put(&OrderEvent::new(&order))?;
        summary.written += 1;
    }

    let folded = Collation::case_insensitive("en");
    let large = Predicate::<Order>::new(|o| o.field("total").gt(500));
    let amani = Predicate::<Order>::new(|o| o.field("customer").eq_to("amani"));

    summary.large = store.count_where(&large, None)?;
    summary.amani = store.count_where(&amani, Some(&folded))?;
    summary.customers = store
        .distinct::<Order, String>("customer", &Predicate::always(), Some(&folded))?
        .collect::<StoreResult<Vec<_>>>()?
        .len();

    let closable = large
        .or_else(&amani)
        .unwrap_or_else(|| large.clone());
    summary.closed = store.update(
        &closable,
        &Update::new().set("status", "closed"),
        Some(&folded),
    )?;

    let closed = Predicate::<Order>::new(|o| o.field("status").eq_to("closed"));
    summary.removed = store.remove_where(&closed, None)?;

    tracing::info!(
        written = summary.written,
        remaining = store.count::<Order>()?,
        "demo finished"
    );
    Ok(summary)
}
