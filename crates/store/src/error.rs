use thiserror::Error;
use uuid::Uuid;

use domain::Failure;

/// Errors that can occur inside the persistence layer.
///
/// These never cross the repository or unit-of-work boundary: they are
/// converted to [`Failure`] values with stable, non-leaking descriptions
/// before callers see them.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested entity does not exist.
    #[error("{entity} with Id '{id}' not found")]
    NotFound { entity: &'static str, id: Uuid },

    /// An optimistic concurrency check failed: another writer updated the
    /// row since this unit of work read it.
    #[error(
        "Concurrency conflict for {entity} with Id '{id}': expected version {expected}, found {actual}"
    )]
    ConcurrencyConflict {
        entity: &'static str,
        id: Uuid,
        expected: i64,
        actual: i64,
    },

    /// A uniqueness constraint was violated.
    #[error("A {entity} with the same {field} already exists")]
    UniqueViolation {
        entity: &'static str,
        field: &'static str,
    },

    /// A staged change references a parent row that does not exist.
    #[error("{parent} with Id '{id}' does not exist")]
    ForeignKeyViolation { parent: &'static str, id: Uuid },

    /// Transient connectivity faults persisted past the bounded retry policy.
    #[error("The database was unavailable after {attempts} attempts")]
    Unavailable {
        attempts: u32,
        #[source]
        source: Box<StoreError>,
    },

    /// A staged change was malformed (e.g. an insert reached the backend
    /// without its commit timestamp assigned).
    #[error("{0}")]
    InvalidChange(&'static str),

    /// A database error occurred.
    #[error("database error")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("migration error")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl StoreError {
    /// Returns true for connectivity faults worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StoreError::Database(sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut)
        )
    }
}

impl From<StoreError> for Failure {
    fn from(err: StoreError) -> Self {
        match &err {
            StoreError::NotFound { .. } => Failure::not_found(err.to_string()),
            StoreError::ConcurrencyConflict { .. } | StoreError::UniqueViolation { .. } => {
                Failure::conflict(err.to_string())
            }
            StoreError::ForeignKeyViolation { .. } => Failure::validation(err.to_string()),
            StoreError::Unavailable { .. } => Failure::transient(err.to_string()),
            StoreError::InvalidChange(_) => Failure::unexpected(err.to_string()),
            // Raw driver details stay in logs, not in caller-visible reasons.
            StoreError::Database(_) => {
                Failure::unexpected("An unexpected database error occurred")
            }
            StoreError::Migration(_) => Failure::unexpected("Database schema setup failed"),
        }
    }
}

/// Result type for persistence-layer internals.
pub type Result<T> = std::result::Result<T, StoreError>;
