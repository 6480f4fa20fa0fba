use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use common::CustomerId;
use store::{Database, UnitOfWork};

use crate::command::{CommandError, CommandHandler, CommandResult, ensure_active};
use crate::publisher::{EventPublisher, dispatch_pending};

/// Input for renaming an existing customer.
#[derive(Debug, Clone)]
pub struct RenameCustomerOptions {
    pub customer_id: CustomerId,
    pub name: String,
}

/// Renames a customer, guarded by the stored version: a concurrent update
/// since the load surfaces as a conflict, not a silent overwrite.
pub struct RenameCustomerHandler {
    db: Arc<dyn Database>,
    publisher: Arc<dyn EventPublisher>,
}

impl RenameCustomerHandler {
    pub fn new(db: Arc<dyn Database>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self { db, publisher }
    }
}

#[async_trait]
impl CommandHandler for RenameCustomerHandler {
    type Options = RenameCustomerOptions;
    type Output = ();

    #[tracing::instrument(skip(self, options, cancel), fields(customer_id = %options.customer_id))]
    async fn handle(
        &self,
        options: Self::Options,
        cancel: CancellationToken,
    ) -> CommandResult<()> {
        ensure_active(&cancel)?;

        let uow = UnitOfWork::new(self.db.clone());
        let mut customer = uow.customers().get_by_id(options.customer_id).await?;
        ensure_active(&cancel)?;

        customer.rename(options.name)?;
        uow.customers().update(&customer).await?;

        if cancel.is_cancelled() {
            uow.discard_changes().await;
            return Err(CommandError::Cancelled);
        }
        uow.save_changes().await?;

        dispatch_pending(&mut customer, self.publisher.as_ref()).await?;
        tracing::info!(customer_id = %options.customer_id, "customer renamed");
        Ok(())
    }
}
