use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use common::CustomerId;
use store::{Database, UnitOfWork};

use crate::command::{CommandError, CommandHandler, CommandResult, ensure_active};

/// Input for deleting a customer.
#[derive(Debug, Clone, Copy)]
pub struct DeleteCustomerOptions {
    pub customer_id: CustomerId,
}

/// Deletes a customer; the commit cascades to the customer's orders.
pub struct DeleteCustomerHandler {
    db: Arc<dyn Database>,
}

impl DeleteCustomerHandler {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CommandHandler for DeleteCustomerHandler {
    type Options = DeleteCustomerOptions;
    type Output = ();

    #[tracing::instrument(skip(self, options, cancel), fields(customer_id = %options.customer_id))]
    async fn handle(
        &self,
        options: Self::Options,
        cancel: CancellationToken,
    ) -> CommandResult<()> {
        ensure_active(&cancel)?;

        let uow = UnitOfWork::new(self.db.clone());
        uow.customers().delete(options.customer_id).await?;

        if cancel.is_cancelled() {
            uow.discard_changes().await;
            return Err(CommandError::Cancelled);
        }
        uow.save_changes().await?;

        tracing::info!(customer_id = %options.customer_id, "customer deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::{
        CreateCustomerHandler, CreateCustomerOptions, PlaceOrderHandler, PlaceOrderOptions,
    };
    use crate::publisher::RecordingPublisher;
    use domain::Money;
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

    #[tokio::test]
    async fn deletes_the_customer_and_its_orders() {
        let db = InMemoryDatabase::new();
        let id = seeded(&db).await;

        let publisher = Arc::new(RecordingPublisher::new());
        PlaceOrderHandler::new(Arc::new(db.clone()), publisher)
            .handle(
                PlaceOrderOptions {
                    customer_id: id,
                    total_amount: Money::from_cents(1999),
                    status: "Pending".into(),
                },
                CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(db.order_count().await, 1);

        DeleteCustomerHandler::new(Arc::new(db.clone()))
            .handle(DeleteCustomerOptions { customer_id: id }, CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(db.customer_count().await, 0);
        assert_eq!(db.order_count().await, 0);
    }

    #[tokio::test]
    async fn unknown_customer_is_an_explicit_not_found() {
        let db = InMemoryDatabase::new();

        let err = DeleteCustomerHandler::new(Arc::new(db.clone()))
            .handle(
                DeleteCustomerOptions {
                    customer_id: CustomerId::new(),
                },
                CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert!(err.failure().unwrap().is_not_found());
    }

    #[tokio::test]
    async fn cancellation_keeps_the_customer() {
        let db = InMemoryDatabase::new();
        let id = seeded(&db).await;

        let token = CancellationToken::new();
        token.cancel();

        let err = DeleteCustomerHandler::new(Arc::new(db.clone()))
            .handle(DeleteCustomerOptions { customer_id: id }, token)
            .await
            .unwrap_err();

        assert!(matches!(err, CommandError::Cancelled));
        assert_eq!(db.customer_count().await, 1);
    }
}
