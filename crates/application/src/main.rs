//! Scaffold entry point: wires the Postgres backend to the command
//! handlers and runs a small demonstration sequence.

use std::sync::Arc;

use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use application::{
    CommandHandler, Config, CreateCustomerHandler, CreateCustomerOptions, PlaceOrderHandler,
    PlaceOrderOptions, RenameCustomerHandler, RenameCustomerOptions, TracingPublisher,
};
use domain::Money;
use store::{Database, PostgresDatabase, UnitOfWork};

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone())),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let db = PostgresDatabase::connect(&config.database_url, config.max_connections)
        .await
        .expect("failed to connect to the database");
    db.run_migrations().await.expect("failed to run migrations");
    let db: Arc<dyn Database> = Arc::new(db);

    let publisher = Arc::new(TracingPublisher);

    // One root token; SIGINT cancels every in-flight command.
    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            tracing::info!("received SIGINT, cancelling in-flight commands");
            signal_token.cancel();
        }
    });

    let create = CreateCustomerHandler::new(db.clone(), publisher.clone());
    let rename = RenameCustomerHandler::new(db.clone(), publisher.clone());
    let place = PlaceOrderHandler::new(db.clone(), publisher.clone());

    let customer_id = create
        .handle(
            CreateCustomerOptions {
                name: "Ada Lovelace".into(),
                email: format!("ada+{}@example.com", uuid_suffix()),
            },
            cancel.clone(),
        )
        .await
        .expect("create customer failed");

    rename
        .handle(
            RenameCustomerOptions {
                customer_id,
                name: "Ada King".into(),
            },
            cancel.clone(),
        )
        .await
        .expect("rename customer failed");

    let order_id = place
        .handle(
            PlaceOrderOptions {
                customer_id,
                total_amount: Money::from_cents(12_999),
                status: "Pending".into(),
            },
            cancel.clone(),
        )
        .await
        .expect("place order failed");

    let uow = UnitOfWork::new(db);
    let customers = uow.customers().get_all().await.expect("listing failed");
    let orders = uow.orders().get_all().await.expect("listing failed");
    tracing::info!(
        %customer_id,
        %order_id,
        customers = customers.len(),
        orders = orders.len(),
        "demonstration sequence complete"
    );
}

/// Short random suffix so repeated runs do not trip the email uniqueness
/// constraint.
fn uuid_suffix() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    id[..8].to_string()
}
