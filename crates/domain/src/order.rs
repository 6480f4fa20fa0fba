//! The order aggregate.

use chrono::{DateTime, Utc};
use common::{CustomerId, OrderId};
use serde::{Deserialize, Serialize};

use crate::entity::{AggregateRoot, DomainEvent, DomainEvents, Entity};
use crate::money::Money;
use crate::result::{Failure, OpResult};

/// Events raised by the order aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OrderEvent {
    /// An order was placed for a customer.
    OrderPlaced {
        order_id: OrderId,
        customer_id: CustomerId,
        total_amount: Money,
        status: String,
    },
}

impl DomainEvent for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::OrderPlaced { .. } => "OrderPlaced",
        }
    }
}

/// An order owned by a customer.
///
/// An order cannot exist without a valid customer; the store enforces the
/// foreign key and cascades removal when the owning customer is deleted.
#[derive(Debug, Clone)]
pub struct Order {
    id: OrderId,
    customer_id: CustomerId,
    total_amount: Money,
    status: String,
    created_at: Option<DateTime<Utc>>,
    version: i64,
    events: DomainEvents<OrderEvent>,
}

impl Order {
    /// Maximum length of an order status.
    pub const MAX_STATUS_LEN: usize = 50;

    /// Places a new order for a customer, raising `OrderPlaced`.
    pub fn place(
        customer_id: CustomerId,
        total_amount: Money,
        status: impl Into<String>,
    ) -> OpResult<Self> {
        let status = status.into();
        validate_status(&status)?;

        let id = OrderId::new();
        let mut order = Self {
            id,
            customer_id,
            total_amount,
            status: status.clone(),
            created_at: None,
            version: 0,
            events: DomainEvents::new(),
        };
        order.events.raise(OrderEvent::OrderPlaced {
            order_id: id,
            customer_id,
            total_amount,
            status,
        });
        Ok(order)
    }

    /// Reconstructs an order from stored state. Raises no events.
    pub fn hydrate(
        id: OrderId,
        customer_id: CustomerId,
        total_amount: Money,
        status: impl Into<String>,
        created_at: DateTime<Utc>,
        version: i64,
    ) -> Self {
        Self {
            id,
            customer_id,
            total_amount,
            status: status.into(),
            created_at: Some(created_at),
            version,
            events: DomainEvents::new(),
        }
    }

    /// Returns the owning customer's identifier.
    pub fn customer_id(&self) -> CustomerId {
        self.customer_id
    }

    /// Returns the order total.
    pub fn total_amount(&self) -> Money {
        self.total_amount
    }

    /// Returns the order status.
    pub fn status(&self) -> &str {
        &self.status
    }

    /// Returns the creation timestamp, if already assigned at commit.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    /// Returns the optimistic-concurrency version.
    pub fn version(&self) -> i64 {
        self.version
    }

    /// Assigns the creation timestamp. Called by the unit of work just
    /// before commit for newly-added orders; a timestamp already set is
    /// left untouched.
    pub fn assign_created_at(&mut self, at: DateTime<Utc>) {
        if self.created_at.is_none() {
            self.created_at = Some(at);
        }
    }
}

fn validate_status(status: &str) -> OpResult<()> {
    if status.trim().is_empty() {
        return Err(Failure::validation("Order status is required"));
    }
    if status.len() > Order::MAX_STATUS_LEN {
        return Err(Failure::validation(format!(
            "Order status must be at most {} characters",
            Order::MAX_STATUS_LEN
        )));
    }
    Ok(())
}

impl Entity for Order {
    type Id = OrderId;

    fn id(&self) -> OrderId {
        self.id
    }
}

impl AggregateRoot for Order {
    type Event = OrderEvent;

    fn pending_events(&self) -> &[OrderEvent] {
        self.events.pending()
    }

    fn clear_domain_events(&mut self) {
        self.events.clear();
    }

    fn take_domain_events(&mut self) -> Vec<OrderEvent> {
        self.events.take()
    }
}

impl PartialEq for Order {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Order {}

impl std::hash::Hash for Order {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
