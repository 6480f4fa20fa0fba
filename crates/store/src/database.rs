use async_trait::async_trait;

use common::{CustomerId, OrderId};
use domain::{Customer, Order};

use crate::Result;
use crate::change::StagedChange;

/// Backend trait for the relational store.
///
/// Implementations must be thread-safe; each unit of work holds its own
/// handle, and concurrent units only interact through the durable state
/// behind this trait.
#[async_trait]
pub trait Database: Send + Sync {
    /// Fetches a customer by id straight from durable state, bypassing any
    /// staged changes.
    async fn customer_by_id(&self, id: CustomerId) -> Result<Option<Customer>>;

    /// Fetches all customers, unfiltered.
    async fn all_customers(&self) -> Result<Vec<Customer>>;

    /// Fetches an order by id straight from durable state.
    async fn order_by_id(&self, id: OrderId) -> Result<Option<Order>>;

    /// Fetches all orders, unfiltered.
    async fn all_orders(&self) -> Result<Vec<Order>>;

    /// Applies staged changes atomically, in the order given.
    ///
    /// Either all changes become durable and visible together, or none do.
    /// Updates are guarded by the entity's version marker and fail with
    /// `ConcurrencyConflict` when another writer got there first. Inserts
    /// must arrive with their creation timestamp already assigned (the unit
    /// of work stamps them just before calling this).
    ///
    /// Returns the number of staged changes applied.
    async fn apply(&self, changes: Vec<StagedChange>) -> Result<usize>;
}
