//! Persistence layer for the transactional scaffold.
//!
//! A [`UnitOfWork`] owns one shared context for the duration of one logical
//! operation. Repositories obtained from it stage changes against that
//! context without committing; [`UnitOfWork::save_changes`] is the single
//! commit point and applies all staged changes atomically through a
//! [`Database`] backend. Two backends are provided: [`PostgresDatabase`]
//! for production and [`InMemoryDatabase`] for tests.

pub mod change;
pub mod database;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod repository;
mod retry;
pub mod unit_of_work;

pub use change::StagedChange;
pub use database::Database;
pub use error::{Result, StoreError};
pub use memory::InMemoryDatabase;
pub use postgres::PostgresDatabase;
pub use repository::{CustomerRepository, OrderRepository};
pub use unit_of_work::UnitOfWork;
