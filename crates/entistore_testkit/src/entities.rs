//! Sample entities, one per identity strategy.

use entistore_core::entity::SequenceId;
use entistore_core::{Entity, EntityHeader, Guid, IndexDeclaration, ObjectId};
use serde::{Deserialize, Serialize};

/// A customer keyed by a random UUID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    #[serde(flatten)]
    header: EntityHeader<Guid>,
    /// Display name.
    pub name: String,
    /// Contact address.
    pub email: String,
    /// Loyalty tier, 0 for none.
    pub tier: i64,
    /// Whether the customer gets priority handling.
    pub vip: bool,
    /// Free-form labels.
    pub tags: Vec<String>,
}

impl Customer {
    /// Creates a tier-0, non-VIP customer without tags.
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            header: EntityHeader::new(),
            name: name.into(),
            email: email.into(),
            tier: 0,
            vip: false,
            tags: Vec::new(),
        }
    }

    /// Creates a customer with a chosen identity.
    pub fn with_id(id: Guid, name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            header: EntityHeader::with_id(id),
            ..Self::new(name, email)
        }
    }

    /// Sets the tier.
    #[must_use]
    pub fn tier(mut self, tier: i64) -> Self {
        self.tier = tier;
        self
    }

    /// Marks the customer as VIP.
    #[must_use]
    pub fn vip(mut self) -> Self {
        self.vip = true;
        self
    }

    /// Adds a tag.
    #[must_use]
    pub fn tagged(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }
}

impl Entity for Customer {
    const NAME: &'static str = "Customer";
    type Id = Guid;

    fn header(&self) -> &EntityHeader<Guid> {
        &self.header
    }

    const INDEXES: &'static [IndexDeclaration] = &[
        IndexDeclaration::new("by_email", &["email"]),
        IndexDeclaration::new("by_tier", &["tier"]),
    ];
}

/// A support ticket keyed by an object id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    #[serde(flatten)]
    header: EntityHeader<ObjectId>,
    /// Short summary.
    pub title: String,
    /// Larger is more urgent.
    pub priority: i64,
    /// Agent the ticket is assigned to.
    pub assignee: Option<String>,
}

impl Ticket {
    /// Creates an unassigned ticket.
    pub fn new(title: impl Into<String>, priority: i64) -> Self {
        Self {
            header: EntityHeader::new(),
            title: title.into(),
            priority,
            assignee: None,
        }
    }

    /// Creates a ticket that expires as soon as it is stored.
    pub fn expired(title: impl Into<String>) -> Self {
        Self {
            header: EntityHeader::with_retention(0),
            ..Self::new(title, 0)
        }
    }

    /// Assigns the ticket.
    #[must_use]
    pub fn assigned_to(mut self, agent: impl Into<String>) -> Self {
        self.assignee = Some(agent.into());
        self
    }
}

impl Entity for Ticket {
    const NAME: &'static str = "Ticket";
    type Id = ObjectId;

    fn header(&self) -> &EntityHeader<ObjectId> {
        &self.header
    }

    // Two declarations under one name form a compound index.
    const INDEXES: &'static [IndexDeclaration] = &[
        IndexDeclaration::new("by_queue", &["assignee"]),
        IndexDeclaration::new("by_queue", &["priority"]),
    ];
}

/// A sensor reading keyed by a time-ordered sequence id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    #[serde(flatten)]
    header: EntityHeader<SequenceId>,
    /// Sensor name.
    pub sensor: String,
    /// Measured value.
    pub value: i64,
}

impl Reading {
    /// Creates a reading.
    pub fn new(sensor: impl Into<String>, value: i64) -> Self {
        Self {
            header: EntityHeader::new(),
            sensor: sensor.into(),
            value,
        }
    }
}

impl Entity for Reading {
    const NAME: &'static str = "Reading";
    type Id = SequenceId;

    fn header(&self) -> &EntityHeader<SequenceId> {
        &self.header
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use entistore_core::entity::{declared_indexes, IdStrategy, EXPIRY_INDEX_NAME};
    use entistore_core::EntityKey;

    #[test]
    fn every_strategy_is_covered() {
        assert_eq!(<<Customer as Entity>::Id as EntityKey>::STRATEGY, IdStrategy::Guid);
        assert_eq!(<<Ticket as Entity>::Id as EntityKey>::STRATEGY, IdStrategy::ObjectId);
        assert_eq!(<<Reading as Entity>::Id as EntityKey>::STRATEGY, IdStrategy::Sequence);
    }

    #[test]
    fn ticket_queue_index_is_compound() {
        let indexes = declared_indexes::<Ticket>();
        assert_eq!(indexes.len(), 2);
        assert_eq!(indexes[0].name, EXPIRY_INDEX_NAME);
        assert_eq!(indexes[1].name, "by_queue");
        assert_eq!(indexes[1].fields, vec!["assignee", "priority"]);
    }

    #[test]
    fn expired_ticket_expires_at_creation() {
        let ticket = Ticket::expired("stale");
        assert_eq!(ticket.header().created_at(), ticket.header().expires_at());
    }
}
