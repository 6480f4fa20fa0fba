//! The unit of work: one context, one commit point.

use std::sync::Arc;

use chrono::Utc;

use domain::{Failure, OpResult};

use crate::change::StagedChange;
use crate::database::Database;
use crate::repository::{Context, CustomerRepository, OrderRepository};

/// Owns one persistence context for the duration of one logical operation.
///
/// Every repository obtained from a unit of work is bound to the same
/// context, so staged changes from multiple repositories land in one
/// pending set and commit together. A unit of work is scoped to a single
/// operation: create one per inbound command, commit once, drop it.
/// Dropping releases the context; it is not built for concurrent
/// `save_changes` calls on one instance.
pub struct UnitOfWork {
    ctx: Arc<Context>,
}

impl UnitOfWork {
    /// Creates a unit of work over the given backend.
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self {
            ctx: Arc::new(Context::new(db)),
        }
    }

    /// Returns a customer repository bound to this unit's context.
    pub fn customers(&self) -> CustomerRepository {
        CustomerRepository::bound_to(self.ctx.clone())
    }

    /// Returns an order repository bound to this unit's context.
    pub fn orders(&self) -> OrderRepository {
        OrderRepository::bound_to(self.ctx.clone())
    }

    /// Returns the number of staged, uncommitted changes.
    pub async fn pending_changes(&self) -> usize {
        self.ctx.pending.lock().await.len()
    }

    /// Discards all staged, uncommitted changes. Used when an operation is
    /// cancelled before its commit.
    pub async fn discard_changes(&self) {
        self.ctx.pending.lock().await.clear();
    }

    /// Commits all staged changes as one atomic operation.
    ///
    /// Immediately before commit, every staged insert whose creation
    /// timestamp is unset gets stamped with the current time — one instant
    /// per commit, assigned centrally here rather than per repository.
    ///
    /// On success the staged set is cleared and the number of applied
    /// changes returned. On failure nothing was applied and the staged set
    /// is left intact; a concurrency conflict surfaces as a
    /// distinguishable conflict failure and is never retried here.
    #[tracing::instrument(skip(self))]
    pub async fn save_changes(&self) -> OpResult<usize> {
        let staged: Vec<StagedChange> = self.ctx.pending.lock().await.clone();
        if staged.is_empty() {
            return Ok(0);
        }

        let now = Utc::now();
        let staged: Vec<StagedChange> = staged
            .into_iter()
            .map(|change| match change {
                StagedChange::InsertCustomer(mut c) => {
                    c.assign_created_at(now);
                    StagedChange::InsertCustomer(c)
                }
                StagedChange::InsertOrder(mut o) => {
                    o.assign_created_at(now);
                    StagedChange::InsertOrder(o)
                }
                other => other,
            })
            .collect();

        match self.ctx.db.apply(staged).await {
            Ok(applied) => {
                self.ctx.pending.lock().await.clear();
                tracing::debug!(applied, "changes committed");
                Ok(applied)
            }
            Err(err) => {
                tracing::warn!(error = %err, "commit failed, staged changes kept");
                Err(Failure::from(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use common::CustomerId;
    use domain::{AggregateRoot, Customer, Entity, FailureKind, Money, Order};

    use crate::memory::InMemoryDatabase;

    fn unit_over(db: &InMemoryDatabase) -> UnitOfWork {
        UnitOfWork::new(Arc::new(db.clone()))
    }

    #[tokio::test]
    async fn add_commit_then_get_returns_customer_with_created_at() {
        let db = InMemoryDatabase::new();
        let uow = unit_over(&db);

        let customer = Customer::new("Ann", "ann@x.com").unwrap();
        let id = customer.id();
        assert!(customer.created_at().is_none());

        let before_save = Utc::now();
        uow.customers().add(&customer).await.unwrap();
        uow.save_changes().await.unwrap();

        let fetched = uow.customers().get_by_id(id).await.unwrap();
        assert_eq!(fetched.name(), "Ann");
        let created_at = fetched.created_at().unwrap();
        assert!(created_at >= before_save);
    }

    #[tokio::test]
    async fn delete_of_missing_customer_fails_and_store_is_unchanged() {
        let db = InMemoryDatabase::new();
        let uow = unit_over(&db);

        let id = CustomerId::new();
        let failure = uow.customers().delete(id).await.unwrap_err();

        assert_eq!(failure.kind(), FailureKind::NotFound);
        assert_eq!(
            failure.to_string(),
            format!("Customer with Id '{id}' not found")
        );
        assert_eq!(uow.pending_changes().await, 0);
        assert_eq!(db.customer_count().await, 0);
    }

    #[tokio::test]
    async fn concurrent_units_racing_on_one_row_leave_exactly_one_winner() {
        let db = InMemoryDatabase::new();

        let setup = unit_over(&db);
        let customer = Customer::new("Ann", "ann@x.com").unwrap();
        let id = customer.id();
        setup.customers().add(&customer).await.unwrap();
        setup.save_changes().await.unwrap();

        // Both units load the same row, both mutate, both commit.
        let uow_a = unit_over(&db);
        let uow_b = unit_over(&db);
        let mut loaded_a = uow_a.customers().get_by_id(id).await.unwrap();
        let mut loaded_b = uow_b.customers().get_by_id(id).await.unwrap();

        loaded_a.rename("Anne").unwrap();
        loaded_b.rename("Annie").unwrap();
        uow_a.customers().update(&loaded_a).await.unwrap();
        uow_b.customers().update(&loaded_b).await.unwrap();

        uow_a.save_changes().await.unwrap();
        let failure = uow_b.save_changes().await.unwrap_err();

        assert!(failure.is_conflict());
        let stored = unit_over(&db).customers().get_by_id(id).await.unwrap();
        assert_eq!(stored.name(), "Anne");
    }

    #[tokio::test]
    async fn commit_is_all_or_nothing() {
        let db = InMemoryDatabase::new();

        let setup = unit_over(&db);
        let existing = Customer::new("Ann", "ann@x.com").unwrap();
        setup.customers().add(&existing).await.unwrap();
        setup.save_changes().await.unwrap();

        // A batch mixing a valid insert with a duplicate-email insert must
        // leave no partial subset behind.
        let uow = unit_over(&db);
        let fine = Customer::new("Bob", "bob@x.com").unwrap();
        let duplicate = Customer::new("Dup", "ann@x.com").unwrap();
        uow.customers().add(&fine).await.unwrap();
        uow.customers().add(&duplicate).await.unwrap();

        let failure = uow.save_changes().await.unwrap_err();
        assert!(failure.is_conflict());
        assert_eq!(db.customer_count().await, 1);

        // Staged changes survive a failed commit.
        assert_eq!(uow.pending_changes().await, 2);
    }

    #[tokio::test]
    async fn repositories_from_one_unit_share_one_commit() {
        let db = InMemoryDatabase::new();
        let uow = unit_over(&db);

        let customer = Customer::new("Ann", "ann@x.com").unwrap();
        let order = Order::place(customer.id(), Money::from_cents(2500), "Pending").unwrap();
        let order_id = order.id();

        uow.customers().add(&customer).await.unwrap();
        uow.orders().add(&order).await.unwrap();
        assert_eq!(uow.pending_changes().await, 2);

        let applied = uow.save_changes().await.unwrap();
        assert_eq!(applied, 2);

        let stored = uow.orders().get_by_id(order_id).await.unwrap();
        assert_eq!(stored.total_amount().cents(), 2500);
        assert!(stored.created_at().is_some());
    }

    #[tokio::test]
    async fn cascade_removes_orders_with_their_customer_in_one_commit() {
        let db = InMemoryDatabase::new();

        let setup = unit_over(&db);
        let customer = Customer::new("Ann", "ann@x.com").unwrap();
        let id = customer.id();
        setup.customers().add(&customer).await.unwrap();
        for cents in [100, 200, 300] {
            let order = Order::place(id, Money::from_cents(cents), "Pending").unwrap();
            setup.orders().add(&order).await.unwrap();
        }
        setup.save_changes().await.unwrap();
        assert_eq!(db.order_count().await, 3);

        let uow = unit_over(&db);
        uow.customers().delete(id).await.unwrap();
        uow.save_changes().await.unwrap();

        assert_eq!(db.customer_count().await, 0);
        assert_eq!(db.order_count().await, 0);
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict_and_store_is_unchanged() {
        let db = InMemoryDatabase::new();

        let setup = unit_over(&db);
        let first = Customer::new("Ann", "ann@x.com").unwrap();
        setup.customers().add(&first).await.unwrap();
        setup.save_changes().await.unwrap();

        let uow = unit_over(&db);
        let second = Customer::new("Other", "ann@x.com").unwrap();
        uow.customers().add(&second).await.unwrap();
        let failure = uow.save_changes().await.unwrap_err();

        assert!(failure.is_conflict());
        assert_eq!(db.customer_count().await, 1);
    }

    #[tokio::test]
    async fn save_with_nothing_staged_is_a_no_op() {
        let db = InMemoryDatabase::new();
        let uow = unit_over(&db);
        assert_eq!(uow.save_changes().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn discard_drops_staged_work() {
        let db = InMemoryDatabase::new();
        let uow = unit_over(&db);

        let customer = Customer::new("Ann", "ann@x.com").unwrap();
        uow.customers().add(&customer).await.unwrap();
        assert_eq!(uow.pending_changes().await, 1);

        uow.discard_changes().await;
        assert_eq!(uow.pending_changes().await, 0);
        assert_eq!(uow.save_changes().await.unwrap(), 0);
        assert_eq!(db.customer_count().await, 0);
    }

    #[tokio::test]
    async fn failed_commit_leaves_pending_events_on_the_aggregate() {
        let db = InMemoryDatabase::new();

        let setup = unit_over(&db);
        let existing = Customer::new("Ann", "ann@x.com").unwrap();
        setup.customers().add(&existing).await.unwrap();
        setup.save_changes().await.unwrap();

        let uow = unit_over(&db);
        let mut duplicate = Customer::new("Dup", "ann@x.com").unwrap();
        uow.customers().add(&duplicate).await.unwrap();
        uow.save_changes().await.unwrap_err();

        // The command layer only drains events after a successful commit;
        // nothing here may have touched the buffer.
        assert_eq!(duplicate.pending_events().len(), 1);
        let _ = duplicate.take_domain_events();
    }
}
