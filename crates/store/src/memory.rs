use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use common::{CustomerId, OrderId};
use domain::{Customer, Entity, Order};

use crate::change::StagedChange;
use crate::database::Database;
use crate::error::{Result, StoreError};

#[derive(Clone, Default)]
struct Tables {
    customers: HashMap<CustomerId, Customer>,
    orders: HashMap<OrderId, Order>,
}

/// In-memory database implementation for testing.
///
/// Provides the same contract as the PostgreSQL backend: atomic batch
/// application, version-guarded updates, a unique email constraint, and
/// cascade deletion of a customer's orders. Changes are applied against a
/// copy of the tables and swapped in only if every change succeeds, so a
/// failed batch leaves durable state untouched.
#[derive(Clone, Default)]
pub struct InMemoryDatabase {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryDatabase {
    /// Creates a new empty in-memory database.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored customers.
    pub async fn customer_count(&self) -> usize {
        self.tables.read().await.customers.len()
    }

    /// Returns the number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.tables.read().await.orders.len()
    }

    /// Clears all rows.
    pub async fn clear(&self) {
        let mut tables = self.tables.write().await;
        tables.customers.clear();
        tables.orders.clear();
    }
}

fn insert_customer(tables: &mut Tables, customer: &Customer) -> Result<()> {
    let created_at = customer
        .created_at()
        .ok_or(StoreError::InvalidChange("insert without creation timestamp"))?;

    if tables.customers.contains_key(&customer.id()) {
        return Err(StoreError::UniqueViolation {
            entity: "Customer",
            field: "Id",
        });
    }
    if tables.customers.values().any(|c| c.email() == customer.email()) {
        return Err(StoreError::UniqueViolation {
            entity: "Customer",
            field: "Email",
        });
    }

    tables.customers.insert(
        customer.id(),
        Customer::hydrate(customer.id(), customer.name(), customer.email(), created_at, 0),
    );
    Ok(())
}

fn update_customer(tables: &mut Tables, customer: &Customer) -> Result<()> {
    let existing = tables.customers.get(&customer.id()).ok_or(StoreError::NotFound {
        entity: "Customer",
        id: customer.id().as_uuid(),
    })?;

    if existing.version() != customer.version() {
        return Err(StoreError::ConcurrencyConflict {
            entity: "Customer",
            id: customer.id().as_uuid(),
            expected: customer.version(),
            actual: existing.version(),
        });
    }
    if tables
        .customers
        .values()
        .any(|c| c.id() != customer.id() && c.email() == customer.email())
    {
        return Err(StoreError::UniqueViolation {
            entity: "Customer",
            field: "Email",
        });
    }

    // created_at is immutable after insert; the stored value wins.
    let created_at = existing.created_at().unwrap_or_default();
    let version = existing.version() + 1;
    tables.customers.insert(
        customer.id(),
        Customer::hydrate(customer.id(), customer.name(), customer.email(), created_at, version),
    );
    Ok(())
}

fn delete_customer(tables: &mut Tables, id: CustomerId) -> Result<()> {
    if tables.customers.remove(&id).is_none() {
        return Err(StoreError::NotFound {
            entity: "Customer",
            id: id.as_uuid(),
        });
    }
    // Cascade: removing a customer removes its orders in the same commit.
    tables.orders.retain(|_, order| order.customer_id() != id);
    Ok(())
}

fn insert_order(tables: &mut Tables, order: &Order) -> Result<()> {
    let created_at = order
        .created_at()
        .ok_or(StoreError::InvalidChange("insert without creation timestamp"))?;

    if tables.orders.contains_key(&order.id()) {
        return Err(StoreError::UniqueViolation {
            entity: "Order",
            field: "Id",
        });
    }
    if !tables.customers.contains_key(&order.customer_id()) {
        return Err(StoreError::ForeignKeyViolation {
            parent: "Customer",
            id: order.customer_id().as_uuid(),
        });
    }

    tables.orders.insert(
        order.id(),
        Order::hydrate(
            order.id(),
            order.customer_id(),
            order.total_amount(),
            order.status(),
            created_at,
            0,
        ),
    );
    Ok(())
}

fn update_order(tables: &mut Tables, order: &Order) -> Result<()> {
    let existing = tables.orders.get(&order.id()).ok_or(StoreError::NotFound {
        entity: "Order",
        id: order.id().as_uuid(),
    })?;

    if existing.version() != order.version() {
        return Err(StoreError::ConcurrencyConflict {
            entity: "Order",
            id: order.id().as_uuid(),
            expected: order.version(),
            actual: existing.version(),
        });
    }

    let created_at = existing.created_at().unwrap_or_default();
    let version = existing.version() + 1;
    tables.orders.insert(
        order.id(),
        Order::hydrate(
            order.id(),
            order.customer_id(),
            order.total_amount(),
            order.status(),
            created_at,
            version,
        ),
    );
    Ok(())
}

fn delete_order(tables: &mut Tables, id: OrderId) -> Result<()> {
    if tables.orders.remove(&id).is_none() {
        return Err(StoreError::NotFound {
            entity: "Order",
            id: id.as_uuid(),
        });
    }
    Ok(())
}

#[async_trait]
impl Database for InMemoryDatabase {
    async fn customer_by_id(&self, id: CustomerId) -> Result<Option<Customer>> {
        Ok(self.tables.read().await.customers.get(&id).cloned())
    }

    async fn all_customers(&self) -> Result<Vec<Customer>> {
        Ok(self.tables.read().await.customers.values().cloned().collect())
    }

    async fn order_by_id(&self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.tables.read().await.orders.get(&id).cloned())
    }

    async fn all_orders(&self) -> Result<Vec<Order>> {
        Ok(self.tables.read().await.orders.values().cloned().collect())
    }

    async fn apply(&self, changes: Vec<StagedChange>) -> Result<usize> {
        let mut tables = self.tables.write().await;

        // Apply against a scratch copy and swap in on success, so a failed
        // batch leaves no partial subset visible.
        let mut scratch = tables.clone();
        let applied = changes.len();
        for change in &changes {
            match change {
                StagedChange::InsertCustomer(c) => insert_customer(&mut scratch, c)?,
                StagedChange::UpdateCustomer(c) => update_customer(&mut scratch, c)?,
                StagedChange::DeleteCustomer(id) => delete_customer(&mut scratch, *id)?,
                StagedChange::InsertOrder(o) => insert_order(&mut scratch, o)?,
                StagedChange::UpdateOrder(o) => update_order(&mut scratch, o)?,
                StagedChange::DeleteOrder(id) => delete_order(&mut scratch, *id)?,
            }
        }

        *tables = scratch;
        Ok(applied)
    }
}
