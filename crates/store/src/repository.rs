//! Repositories bound to a unit of work's shared context.
//!
//! Repositories translate aggregate-level operations into staged changes
//! against the context's pending change set. They never commit; the unit
//! of work owns the single commit point. Reads go straight to the backend
//! and bypass staged changes, so no stale staged copy is ever returned.

use std::sync::Arc;

use tokio::sync::Mutex;

use common::{CustomerId, OrderId};
use domain::{Customer, Failure, OpResult, Order};

use crate::change::StagedChange;
use crate::database::Database;

/// The context shared by one unit of work and its repositories: one
/// backend handle and one pending change set.
pub(crate) struct Context {
    pub(crate) db: Arc<dyn Database>,
    pub(crate) pending: Mutex<Vec<StagedChange>>,
}

impl Context {
    pub(crate) fn new(db: Arc<dyn Database>) -> Self {
        Self {
            db,
            pending: Mutex::new(Vec::new()),
        }
    }

    async fn stage(&self, change: StagedChange) {
        self.pending.lock().await.push(change);
    }
}

/// Persistence operations for customers.
pub struct CustomerRepository {
    ctx: Arc<Context>,
}

impl CustomerRepository {
    pub(crate) fn bound_to(ctx: Arc<Context>) -> Self {
        Self { ctx }
    }

    /// Fetches a customer by id. An absent id is an explicit failure, not
    /// an ambiguous success.
    pub async fn get_by_id(&self, id: CustomerId) -> OpResult<Customer> {
        match self.ctx.db.customer_by_id(id).await {
            Ok(Some(customer)) => Ok(customer),
            Ok(None) => Err(Failure::not_found(format!(
                "Customer with Id '{id}' not found"
            ))),
            Err(err) => Err(Failure::from(err)),
        }
    }

    /// Fetches all customers, unfiltered. Filtering and pagination are the
    /// caller's concern.
    pub async fn get_all(&self) -> OpResult<Vec<Customer>> {
        self.ctx.db.all_customers().await.map_err(Failure::from)
    }

    /// Stages an insert. The creation timestamp stays unset here; the unit
    /// of work assigns it just before commit.
    pub async fn add(&self, customer: &Customer) -> OpResult<()> {
        self.ctx
            .stage(StagedChange::InsertCustomer(customer.clone()))
            .await;
        Ok(())
    }

    /// Stages a full replace of the stored state for this identity.
    pub async fn update(&self, customer: &Customer) -> OpResult<()> {
        self.ctx
            .stage(StagedChange::UpdateCustomer(customer.clone()))
            .await;
        Ok(())
    }

    /// Stages removal of the customer, cascading to its orders at commit.
    /// Fails up front if the id does not exist.
    pub async fn delete(&self, id: CustomerId) -> OpResult<()> {
        match self.ctx.db.customer_by_id(id).await {
            Ok(Some(_)) => {
                self.ctx.stage(StagedChange::DeleteCustomer(id)).await;
                Ok(())
            }
            Ok(None) => Err(Failure::not_found(format!(
                "Customer with Id '{id}' not found"
            ))),
            Err(err) => Err(Failure::from(err)),
        }
    }
}

/// Persistence operations for orders.
pub struct OrderRepository {
    ctx: Arc<Context>,
}

impl OrderRepository {
    pub(crate) fn bound_to(ctx: Arc<Context>) -> Self {
        Self { ctx }
    }

    /// Fetches an order by id. An absent id is an explicit failure.
    pub async fn get_by_id(&self, id: OrderId) -> OpResult<Order> {
        match self.ctx.db.order_by_id(id).await {
            Ok(Some(order)) => Ok(order),
            Ok(None) => Err(Failure::not_found(format!("Order with Id '{id}' not found"))),
            Err(err) => Err(Failure::from(err)),
        }
    }

    /// Fetches all orders, unfiltered.
    pub async fn get_all(&self) -> OpResult<Vec<Order>> {
        self.ctx.db.all_orders().await.map_err(Failure::from)
    }

    /// Stages an insert. The creation timestamp stays unset here.
    pub async fn add(&self, order: &Order) -> OpResult<()> {
        self.ctx.stage(StagedChange::InsertOrder(order.clone())).await;
        Ok(())
    }

    /// Stages a full replace of the stored state for this identity.
    pub async fn update(&self, order: &Order) -> OpResult<()> {
        self.ctx.stage(StagedChange::UpdateOrder(order.clone())).await;
        Ok(())
    }

    /// Stages removal of the order. Its customer is never touched.
    pub async fn delete(&self, id: OrderId) -> OpResult<()> {
        match self.ctx.db.order_by_id(id).await {
            Ok(Some(_)) => {
                self.ctx.stage(StagedChange::DeleteOrder(id)).await;
                Ok(())
            }
            Ok(None) => Err(Failure::not_found(format!("Order with Id '{id}' not found"))),
            Err(err) => Err(Failure::from(err)),
        }
    }
}
