//! Demo entity types.

use entistore_core::entity::SequenceId;
use entistore_core::{Entity, EntityHeader, EntityRegistry, Guid, IndexDeclaration};
use serde::{Deserialize, Serialize};

/// A customer order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    #[serde(flatten)]
    header: EntityHeader<Guid>,
    pub customer: String,
    pub total: i64,
    pub status: String,
}

impl Order {
    pub fn new(customer: impl Into<String>, total: i64) -> Self {
        Self {
            header: EntityHeader::new(),
            customer: customer.into(),
            total,
            status: "open".to_string(),
        }
    }
}

impl Entity for Order {
    const NAME: &'static str = "Order";
    type Id = Guid;

    fn header(&self) -> &EntityHeader<Guid> {
        &self.header
    }

    const INDEXES: &'static [IndexDeclaration] = &[
        IndexDeclaration::new("by_customer", &["customer"]),
        IndexDeclaration::new("by_status", &["status", "total"]),
    ];
}

/// A status change of an order, kept for the retention window only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderEvent {
    #[serde(flatten)]
    header: EntityHeader<SequenceId>,
    pub order: Guid,
    pub status: String,
}

impl OrderEvent {
    pub fn new(order: &Order) -> Self {
        Self {
            header: EntityHeader::new(),
            order: order.id().clone(),
            status: order.status.clone(),
        }
    }
}

impl Entity for OrderEvent {
    const NAME: &'static str = "OrderEvent";
    type Id = SequenceId;

    fn header(&self) -> &EntityHeader<SequenceId> {
        &self.header
    }

    const INDEXES: &'static [IndexDeclaration] =
        &[IndexDeclaration::new("by_order", &["order"])];
}

/// Every demo entity type.
pub fn registry() -> EntityRegistry {
    EntityRegistry::new()
        .register::<Order>()
        .register::<OrderEvent>()
}
