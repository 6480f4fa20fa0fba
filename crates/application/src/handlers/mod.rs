//! Concrete command handlers.
//!
//! One options struct and one handler per business operation. Every
//! handler opens its own unit of work, commits at most once, and
//! dispatches the raised domain events only after that commit succeeded.

mod create_customer;
mod delete_customer;
mod delete_order;
mod place_order;
mod rename_customer;

pub use create_customer::{CreateCustomerHandler, CreateCustomerOptions};
pub use delete_customer::{DeleteCustomerHandler, DeleteCustomerOptions};
pub use delete_order::{DeleteOrderHandler, DeleteOrderOptions};
pub use place_order::{PlaceOrderHandler, PlaceOrderOptions};
pub use rename_customer::{RenameCustomerHandler, RenameCustomerOptions};
