//! Staged changes awaiting commit.

use common::{CustomerId, OrderId};
use domain::{Customer, Order};

/// One pending mutation staged by a repository.
///
/// Changes are applied by the backend in the order they were staged, all
/// within one atomic commit. Deletion of a customer cascades to its orders
/// inside the backend; the change itself only names the customer.
#[derive(Debug, Clone)]
pub enum StagedChange {
    InsertCustomer(Customer),
    UpdateCustomer(Customer),
    DeleteCustomer(CustomerId),
    InsertOrder(Order),
    UpdateOrder(Order),
    DeleteOrder(OrderId),
}

impl StagedChange {
    /// Short label for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            StagedChange::InsertCustomer(_) => "insert customer",
            StagedChange::UpdateCustomer(_) => "update customer",
            StagedChange::DeleteCustomer(_) => "delete customer",
            StagedChange::InsertOrder(_) => "insert order",
            StagedChange::UpdateOrder(_) => "update order",
            StagedChange::DeleteOrder(_) => "delete order",
        }
    }
}
