use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Postgres, Row, Transaction};
use uuid::Uuid;

use common::{CustomerId, OrderId};
use domain::{Customer, Entity, Money, Order};

use crate::change::StagedChange;
use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::retry::with_retries;

/// PostgreSQL-backed database implementation.
///
/// Each `apply` runs in one transaction; updates are guarded by the
/// version column and uniqueness/foreign-key violations are detected by
/// constraint name. Reads and commits go through the bounded
/// transient-fault retry policy.
#[derive(Clone)]
pub struct PostgresDatabase {
    pool: PgPool,
}

impl PostgresDatabase {
    /// Creates a database over an existing connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to the given URL, retrying transient connectivity faults.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let pool = with_retries("connect", || async {
            PgPoolOptions::new()
                .max_connections(max_connections)
                .connect(url)
                .await
                .map_err(StoreError::from)
        })
        .await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Applies the embedded schema migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    async fn try_apply(&self, changes: &[StagedChange]) -> Result<usize> {
        let mut tx = self.pool.begin().await?;
        for change in changes {
            match change {
                StagedChange::InsertCustomer(c) => insert_customer(&mut tx, c).await?,
                StagedChange::UpdateCustomer(c) => update_customer(&mut tx, c).await?,
                StagedChange::DeleteCustomer(id) => delete_customer(&mut tx, *id).await?,
                StagedChange::InsertOrder(o) => insert_order(&mut tx, o).await?,
                StagedChange::UpdateOrder(o) => update_order(&mut tx, o).await?,
                StagedChange::DeleteOrder(id) => delete_order(&mut tx, *id).await?,
            }
        }
        tx.commit().await?;
        Ok(changes.len())
    }
}

fn row_to_customer(row: PgRow) -> Result<Customer> {
    Ok(Customer::hydrate(
        CustomerId::from_uuid(row.try_get::<Uuid, _>("id")?),
        row.try_get::<String, _>("name")?,
        row.try_get::<String, _>("email")?,
        row.try_get::<DateTime<Utc>, _>("created_at")?,
        row.try_get::<i64, _>("version")?,
    ))
}

fn row_to_order(row: PgRow) -> Result<Order> {
    let total: Decimal = row.try_get("total_amount")?;
    Ok(Order::hydrate(
        OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
        CustomerId::from_uuid(row.try_get::<Uuid, _>("customer_id")?),
        money_from_numeric(total)?,
        row.try_get::<String, _>("status")?,
        row.try_get::<DateTime<Utc>, _>("created_at")?,
        row.try_get::<i64, _>("version")?,
    ))
}

fn money_to_numeric(amount: Money) -> Decimal {
    Decimal::new(amount.cents(), 2)
}

fn money_from_numeric(value: Decimal) -> Result<Money> {
    value
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|scaled| scaled.to_i64())
        .map(Money::from_cents)
        .ok_or(StoreError::InvalidChange("order total out of range"))
}

fn constraint_name(err: &sqlx::Error) -> Option<&str> {
    if let sqlx::Error::Database(db_err) = err {
        db_err.constraint()
    } else {
        None
    }
}

fn stamped_at(created_at: Option<DateTime<Utc>>) -> Result<DateTime<Utc>> {
    created_at.ok_or(StoreError::InvalidChange("insert without creation timestamp"))
}

async fn insert_customer(tx: &mut Transaction<'_, Postgres>, customer: &Customer) -> Result<()> {
    let created_at = stamped_at(customer.created_at())?;

    sqlx::query(
        r#"
        INSERT INTO customers (id, name, email, created_at, version)
        VALUES ($1, $2, $3, $4, 0)
        "#,
    )
    .bind(customer.id().as_uuid())
    .bind(customer.name())
    .bind(customer.email())
    .bind(created_at)
    .execute(&mut **tx)
    .await
    .map_err(|e| match constraint_name(&e) {
        Some("customers_email_unique") => StoreError::UniqueViolation {
            entity: "Customer",
            field: "Email",
        },
        Some("customers_pkey") => StoreError::UniqueViolation {
            entity: "Customer",
            field: "Id",
        },
        _ => StoreError::Database(e),
    })?;
    Ok(())
}

async fn update_customer(tx: &mut Transaction<'_, Postgres>, customer: &Customer) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE customers
        SET name = $2, email = $3, version = version + 1
        WHERE id = $1 AND version = $4
        "#,
    )
    .bind(customer.id().as_uuid())
    .bind(customer.name())
    .bind(customer.email())
    .bind(customer.version())
    .execute(&mut **tx)
    .await
    .map_err(|e| match constraint_name(&e) {
        Some("customers_email_unique") => StoreError::UniqueViolation {
            entity: "Customer",
            field: "Email",
        },
        _ => StoreError::Database(e),
    })?;

    if result.rows_affected() == 0 {
        return Err(stale_or_missing(tx, "customers", "Customer", customer.id().as_uuid(), customer.version()).await);
    }
    Ok(())
}

async fn delete_customer(tx: &mut Transaction<'_, Postgres>, id: CustomerId) -> Result<()> {
    // Orders cascade via the foreign key.
    let result = sqlx::query("DELETE FROM customers WHERE id = $1")
        .bind(id.as_uuid())
        .execute(&mut **tx)
        .await?;

    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound {
            entity: "Customer",
            id: id.as_uuid(),
        });
    }
    Ok(())
}

async fn insert_order(tx: &mut Transaction<'_, Postgres>, order: &Order) -> Result<()> {
    let created_at = stamped_at(order.created_at())?;

    sqlx::query(
        r#"
        INSERT INTO orders (id, customer_id, total_amount, status, created_at, version)
        VALUES ($1, $2, $3, $4, $5, 0)
        "#,
    )
    .bind(order.id().as_uuid())
    .bind(order.customer_id().as_uuid())
    .bind(money_to_numeric(order.total_amount()))
    .bind(order.status())
    .bind(created_at)
    .execute(&mut **tx)
    .await
    .map_err(|e| match constraint_name(&e) {
        Some("orders_customer_id_fkey") => StoreError::ForeignKeyViolation {
            parent: "Customer",
            id: order.customer_id().as_uuid(),
        },
        Some("orders_pkey") => StoreError::UniqueViolation {
            entity: "Order",
            field: "Id",
        },
        _ => StoreError::Database(e),
    })?;
    Ok(())
}

async fn update_order(tx: &mut Transaction<'_, Postgres>, order: &Order) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE orders
        SET total_amount = $2, status = $3, version = version + 1
        WHERE id = $1 AND version = $4
        "#,
    )
    .bind(order.id().as_uuid())
    .bind(money_to_numeric(order.total_amount()))
    .bind(order.status())
    .bind(order.version())
    .execute(&mut **tx)
    .await?;

    if result.rows_affected() == 0 {
        return Err(stale_or_missing(tx, "orders", "Order", order.id().as_uuid(), order.version()).await);
    }
    Ok(())
}

async fn delete_order(tx: &mut Transaction<'_, Postgres>, id: OrderId) -> Result<()> {
    let result = sqlx::query("DELETE FROM orders WHERE id = $1")
        .bind(id.as_uuid())
        .execute(&mut **tx)
        .await?;

    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound {
            entity: "Order",
            id: id.as_uuid(),
        });
    }
    Ok(())
}

/// A guarded update touched zero rows: either the row is gone, or another
/// writer moved its version. Looks at the current version to tell which.
async fn stale_or_missing(
    tx: &mut Transaction<'_, Postgres>,
    table: &str,
    entity: &'static str,
    id: Uuid,
    expected: i64,
) -> StoreError {
    let query = format!("SELECT version FROM {table} WHERE id = $1");
    match sqlx::query_scalar::<_, i64>(&query)
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
    {
        Ok(Some(actual)) => StoreError::ConcurrencyConflict {
            entity,
            id,
            expected,
            actual,
        },
        Ok(None) => StoreError::NotFound { entity, id },
        Err(e) => StoreError::Database(e),
    }
}

#[async_trait]
impl Database for PostgresDatabase {
    async fn customer_by_id(&self, id: CustomerId) -> Result<Option<Customer>> {
        let row = with_retries("load customer", || async {
            sqlx::query(
                "SELECT id, name, email, created_at, version FROM customers WHERE id = $1",
            )
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::from)
        })
        .await?;

        row.map(row_to_customer).transpose()
    }

    async fn all_customers(&self) -> Result<Vec<Customer>> {
        let rows = with_retries("load customers", || async {
            sqlx::query(
                "SELECT id, name, email, created_at, version FROM customers ORDER BY created_at",
            )
            .fetch_all(&self.pool)
            .await
            .map_err(StoreError::from)
        })
        .await?;

        rows.into_iter().map(row_to_customer).collect()
    }

    async fn order_by_id(&self, id: OrderId) -> Result<Option<Order>> {
        let row = with_retries("load order", || async {
            sqlx::query(
                "SELECT id, customer_id, total_amount, status, created_at, version FROM orders WHERE id = $1",
            )
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::from)
        })
        .await?;

        row.map(row_to_order).transpose()
    }

    async fn all_orders(&self) -> Result<Vec<Order>> {
        let rows = with_retries("load orders", || async {
            sqlx::query(
                "SELECT id, customer_id, total_amount, status, created_at, version FROM orders ORDER BY created_at",
            )
            .fetch_all(&self.pool)
            .await
            .map_err(StoreError::from)
        })
        .await?;

        rows.into_iter().map(row_to_order).collect()
    }

    async fn apply(&self, changes: Vec<StagedChange>) -> Result<usize> {
        with_retries("commit", || self.try_apply(&changes)).await
    }
}
