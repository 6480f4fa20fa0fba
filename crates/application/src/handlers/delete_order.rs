use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use common::OrderId;
use store::{Database, UnitOfWork};

use crate::command::{CommandError, CommandHandler, CommandResult, ensure_active};

/// Input for deleting an order.
#[derive(Debug, Clone, Copy)]
pub struct DeleteOrderOptions {
    pub order_id: OrderId,
}

/// Deletes one order. Its customer is left untouched.
pub struct DeleteOrderHandler {
    db: Arc<dyn Database>,
}

impl DeleteOrderHandler {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CommandHandler for DeleteOrderHandler {
    type Options = DeleteOrderOptions;
    type Output = ();

    #[tracing::instrument(skip(self, options, cancel), fields(order_id = %options.order_id))]
    async fn handle(
        &self,
        options: Self::Options,
        cancel: CancellationToken,
    ) -> CommandResult<()> {
        ensure_active(&cancel)?;

        let uow = UnitOfWork::new(self.db.clone());
        uow.orders().delete(options.order_id).await?;

        if cancel.is_cancelled() {
            uow.discard_changes().await;
            return Err(CommandError::Cancelled);
        }
        uow.save_changes().await?;

        tracing::info!(order_id = %options.order_id, "order deleted");
        Ok(())
    }
}
