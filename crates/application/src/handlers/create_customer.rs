use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use common::CustomerId;
use domain::{Customer, Entity};
use store::{Database, UnitOfWork};

use crate::command::{CommandError, CommandHandler, CommandResult, ensure_active};
use crate::publisher::{EventPublisher, dispatch_pending};

/// Input for creating a customer.
#[derive(Debug, Clone)]
pub struct CreateCustomerOptions {
    pub name: String,
    pub email: String,
}

/// Creates a customer and publishes `CustomerCreated` after the commit.
pub struct CreateCustomerHandler {
    db: Arc<dyn Database>,
    publisher: Arc<dyn EventPublisher>,
}

impl CreateCustomerHandler {
    pub fn new(db: Arc<dyn Database>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self { db, publisher }
    }
}

#[async_trait]
impl CommandHandler for CreateCustomerHandler {
    type Options = CreateCustomerOptions;
    type Output = CustomerId;

    #[tracing::instrument(skip(self, options, cancel), fields(email = %options.email))]
    async fn handle(
        &self,
        options: Self::Options,
        cancel: CancellationToken,
    ) -> CommandResult<CustomerId> {
        ensure_active(&cancel)?;

        let mut customer = Customer::new(options.name, options.email)?;
        let id = customer.id();

        let uow = UnitOfWork::new(self.db.clone());
        uow.customers().add(&customer).await?;

        if cancel.is_cancelled() {
            uow.discard_changes().await;
            return Err(CommandError::Cancelled);
        }
        uow.save_changes().await?;

        dispatch_pending(&mut customer, self.publisher.as_ref()).await?;
        tracing::info!(%id, "customer created");
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publisher::RecordingPublisher;
    use domain::FailureKind;
    use store::InMemoryDatabase;

    fn handler(
        db: &InMemoryDatabase,
        publisher: &Arc<RecordingPublisher>,
    ) -> CreateCustomerHandler {
        CreateCustomerHandler::new(Arc::new(db.clone()), publisher.clone())
    }

    fn options() -> CreateCustomerOptions {
        CreateCustomerOptions {
            name: "Ann".into(),
            email: "ann@x.com".into(),
        }
    }

    #[tokio::test]
    async fn creates_customer_and_publishes_the_event() {
        let db = InMemoryDatabase::new();
        let publisher = Arc::new(RecordingPublisher::new());

        let id = handler(&db, &publisher)
            .handle(options(), CancellationToken::new())
            .await
            .unwrap();

        let stored = db.customer_by_id(id).await.unwrap().unwrap();
        assert_eq!(stored.email(), "ann@x.com");
        assert!(stored.created_at().is_some());

        let events = publisher.events().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "CustomerCreated");
    }

    #[tokio::test]
    async fn invalid_email_fails_without_touching_the_store() {
        let db = InMemoryDatabase::new();
        let publisher = Arc::new(RecordingPublisher::new());

        let err = handler(&db, &publisher)
            .handle(
                CreateCustomerOptions {
                    name: "Ann".into(),
                    email: "not-an-email".into(),
                },
                CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert_eq!(err.failure().unwrap().kind(), FailureKind::Validation);
        assert_eq!(db.customer_count().await, 0);
        assert!(publisher.events().await.is_empty());
    }

    #[tokio::test]
    async fn duplicate_email_surfaces_as_a_conflict() {
        let db = InMemoryDatabase::new();
        let publisher = Arc::new(RecordingPublisher::new());
        let h = handler(&db, &publisher);

        h.handle(options(), CancellationToken::new()).await.unwrap();
        let err = h
            .handle(
                CreateCustomerOptions {
                    name: "Other".into(),
                    email: "ann@x.com".into(),
                },
                CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert!(err.failure().unwrap().is_conflict());
        assert_eq!(db.customer_count().await, 1);
    }

    #[tokio::test]
    async fn already_cancelled_token_commits_nothing() {
        let db = InMemoryDatabase::new();
        let publisher = Arc::new(RecordingPublisher::new());

        let token = CancellationToken::new();
        token.cancel();

        let err = handler(&db, &publisher)
            .handle(options(), token)
            .await
            .unwrap_err();

        assert!(matches!(err, CommandError::Cancelled));
        assert_eq!(db.customer_count().await, 0);
        assert!(publisher.events().await.is_empty());
    }

    #[tokio::test]
    async fn failed_dispatch_keeps_the_committed_customer() {
        let db = InMemoryDatabase::new();
        let publisher = Arc::new(RecordingPublisher::new());
        publisher.fail_next().await;

        let err = handler(&db, &publisher)
            .handle(options(), CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(err.failure().unwrap().kind(), FailureKind::Transient);
        assert_eq!(db.customer_count().await, 1);
    }
}
