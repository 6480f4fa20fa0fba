use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use common::{CustomerId, OrderId};
use domain::{Entity, Money, Order};
use store::{Database, UnitOfWork};

use crate::command::{CommandError, CommandHandler, CommandResult, ensure_active};
use crate::publisher::{EventPublisher, dispatch_pending};

/// Input for placing an order for an existing customer.
#[derive(Debug, Clone)]
pub struct PlaceOrderOptions {
    pub customer_id: CustomerId,
    pub total_amount: Money,
    pub status: String,
}

/// Places an order and publishes `OrderPlaced` after the commit. The
/// customer is loaded first so a missing one fails before anything is
/// staged.
pub struct PlaceOrderHandler {
    db: Arc<dyn Database>,
    publisher: Arc<dyn EventPublisher>,
}

impl PlaceOrderHandler {
    pub fn new(db: Arc<dyn Database>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self { db, publisher }
    }
}

#[async_trait]
impl CommandHandler for PlaceOrderHandler {
    type Options = PlaceOrderOptions;
    type Output = OrderId;

    #[tracing::instrument(skip(self, options, cancel), fields(customer_id = %options.customer_id))]
    async fn handle(
        &self,
        options: Self::Options,
        cancel: CancellationToken,
    ) -> CommandResult<OrderId> {
        ensure_active(&cancel)?;

        let uow = UnitOfWork::new(self.db.clone());
        uow.customers().get_by_id(options.customer_id).await?;
        ensure_active(&cancel)?;

        let mut order = Order::place(options.customer_id, options.total_amount, options.status)?;
        let id = order.id();
        uow.orders().add(&order).await?;

        if cancel.is_cancelled() {
            uow.discard_changes().await;
            return Err(CommandError::Cancelled);
        }
        uow.save_changes().await?;

        dispatch_pending(&mut order, self.publisher.as_ref()).await?;
        tracing::info!(order_id = %id, "order placed");
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::{CreateCustomerHandler, CreateCustomerOptions};
    use crate::publisher::RecordingPublisher;
    use store::InMemoryDatabase;

    async fn seeded(db: &InMemoryDatabase) -> CustomerId {
        let publisher = Arc::new(RecordingPublisher::new());
        CreateCustomerHandler::new(Arc::new(db.clone()), publisher)
            .handle(
                CreateCustomerOptions {
                    name: "Ann".into(),
                    email: "ann@x.com".into(),
                },
                CancellationToken::new(),
            )
            .await
            .unwrap()
    }

    fn options(customer_id: CustomerId) -> PlaceOrderOptions {
        PlaceOrderOptions {
            customer_id,
            total_amount: Money::from_cents(1999),
            status: "Pending".into(),
        }
    }

    #[tokio::test]
    async fn places_order_and_publishes_the_event() {
        let db = InMemoryDatabase::new();
        let customer_id = seeded(&db).await;
        let publisher = Arc::new(RecordingPublisher::new());

        let id = PlaceOrderHandler::new(Arc::new(db.clone()), publisher.clone())
            .handle(options(customer_id), CancellationToken::new())
            .await
            .unwrap();

        let stored = db.order_by_id(id).await.unwrap().unwrap();
        assert_eq!(stored.customer_id(), customer_id);
        assert_eq!(stored.total_amount(), Money::from_cents(1999));
        assert!(stored.created_at().is_some());

        let events = publisher.events().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "OrderPlaced");
    }

    #[tokio::test]
    async fn missing_customer_fails_before_staging_anything() {
        let db = InMemoryDatabase::new();
        let publisher = Arc::new(RecordingPublisher::new());

        let err = PlaceOrderHandler::new(Arc::new(db.clone()), publisher.clone())
            .handle(options(CustomerId::new()), CancellationToken::new())
            .await
            .unwrap_err();

        assert!(err.failure().unwrap().is_not_found());
        assert_eq!(db.order_count().await, 0);
        assert!(publisher.events().await.is_empty());
    }

    #[tokio::test]
    async fn cancellation_commits_no_order() {
        let db = InMemoryDatabase::new();
        let customer_id = seeded(&db).await;
        let publisher = Arc::new(RecordingPublisher::new());

        let token = CancellationToken::new();
        token.cancel();

        let err = PlaceOrderHandler::new(Arc::new(db.clone()), publisher)
            .handle(options(customer_id), token)
            .await
            .unwrap_err();

        assert!(matches!(err, CommandError::Cancelled));
        assert_eq!(db.order_count().await, 0);
    }
}
