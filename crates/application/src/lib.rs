//! Command layer for the transactional scaffold.
//!
//! A command handler adapts a validated options value into one unit of
//! business logic: it opens a unit of work, stages mutations through
//! repositories, commits once, and only then dispatches the domain events
//! the aggregates raised. Cancellation is observed cooperatively and is
//! distinct from business failure.

pub mod command;
pub mod config;
pub mod handlers;
pub mod publisher;

pub use command::{CommandError, CommandHandler, CommandResult};
pub use config::Config;
pub use handlers::{
    CreateCustomerHandler, CreateCustomerOptions, DeleteCustomerHandler, DeleteCustomerOptions,
    DeleteOrderHandler, DeleteOrderOptions, PlaceOrderHandler, PlaceOrderOptions,
    RenameCustomerHandler, RenameCustomerOptions,
};
pub use publisher::{EventPublisher, EventRecord, RecordingPublisher, TracingPublisher, dispatch_pending};
