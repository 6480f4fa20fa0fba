//! Domain layer for the transactional scaffold.
//!
//! This crate provides the building blocks the rest of the workspace is
//! written against:
//! - `Failure` / `OpResult` — the success/failure envelope used instead of
//!   panics or ad-hoc error strings for expected failure conditions
//! - `Entity` / `AggregateRoot` / `DomainEvent` capability traits
//! - the `Customer` and `Order` aggregates with their event enums

pub mod customer;
pub mod entity;
pub mod money;
pub mod order;
pub mod result;

pub use customer::{Customer, CustomerEvent};
pub use entity::{AggregateRoot, DomainEvent, DomainEvents, Entity};
pub use money::Money;
pub use order::{Order, OrderEvent};
pub use result::{Failure, FailureKind, OpResult};
