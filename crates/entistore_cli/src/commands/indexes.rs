//! Indexes command implementation.

use super::model::{registry, Order, OrderEvent};
use super::CliError;
use entistore_core::{Entity, EntityStore};
use serde::Serialize;

/// One index of one collection.
#[derive(Debug, Serialize)]
pub struct IndexRow {
    /// Collection name.
    pub collection: String,
    /// Index name.
    pub name: String,
    /// Indexed fields, in order.
    pub fields: Vec<String>,
    /// TTL in seconds, for expiry indexes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expire_after_secs: Option<u64>,
}

fn rows<T: Entity>(store: &EntityStore) -> Result<Vec<IndexRow>, CliError> {
    let handle = store.collection::<T>()?;
    let mut cursor = handle
        .raw()
        .list_indexes()
        .map_err(entistore_core::StoreError::from)?;

    let mut rows = Vec::new();
    while let Some(batch) = cursor
        .next_batch()
        .map_err(entistore_core::StoreError::from)?
    {
        rows.extend(batch.into_iter().map(|index| IndexRow {
            collection: T::NAME.to_string(),
            name: index.name,
            fields: index.keys,
            expire_after_secs: index.expire_after.map(|ttl| ttl.as_secs()),
        }));
    }
    Ok(rows)
}

/// Runs the indexes command.
pub fn run(store: &EntityStore, format: &str) -> Result<(), CliError> {
    let report = store.start(&registry());
    for (name, err) in &report.failed {
        eprintln!("warning: {name} could not be set up: {err}");
    }

    let mut all = rows::<Order>(store)?;
    all.extend(rows::<OrderEvent>(store)?);

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&all)?);
        return Ok(());
    }

    for row in &all {
        match row.expire_after_secs {
            Some(ttl) => println!(
                "{:<12} {:<12} [{}] ttl={}s",
                row.collection,
                row.name,
                row.fields.join(", "),
                ttl
            ),
            None => println!(
                "{:<12} {:<12} [{}]",
                row.collection,
                row.name,
                row.fields.join(", ")
            ),
        }
    }
    Ok(())
}
