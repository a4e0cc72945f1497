use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use uuid::Uuid;

mod config;
mod domain;
mod metrics;
mod outcome;
mod reducer;
mod store;
mod utils;

use config::Config;
use domain::customer_price::{B2bCustomer, CustomerPriceCommandHandler};
use domain::order::{AdjustmentField, OrderCommand, OrderCommandHandler, OrderStatus, StatusEvent};
use domain::shipment::{
    ChildSku, ParentProduct, ShipmentCommand, ShipmentCommandHandler, ShipmentStatus, Warehouse,
};
use outcome::ActionResult;
use store::{B2bStore, MemoryStore, PgStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Default to INFO level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,b2b_fulfillment=debug")),
        )
        .init();

    let config = Config::from_env();
    tracing::info!("🚀 Starting B2B order fulfillment");

    // === 1. Metrics ===
    let metrics = Arc::new(metrics::Metrics::new()?);
    tracing::info!("📊 Metrics registry created with {} metrics", metrics.registry().gather().len());

    let health = Arc::new(metrics::HealthState::new(if config.uses_database() {
        "postgres"
    } else {
        "memory"
    }));

    if config.enable_metrics {
        let registry = Arc::new(metrics.registry().clone());
        let health = health.clone();
        let port = config.metrics_port;
        std::thread::spawn(move || {
            let result = actix_web::rt::System::new()
                .block_on(metrics::start_metrics_server(registry, health, port));
            if let Err(e) = result {
                tracing::error!("Metrics server error: {}", e);
            }
        });
    }

    // === 2. Store ===
    match config.database_url.as_deref() {
        Some(url) => {
            let store: Arc<dyn B2bStore> =
                Arc::new(PgStore::connect(url, config.db_max_connections).await?);
            let products = store.parent_products().await?;
            let warehouses = store.warehouses().await?;
            tracing::info!(
                parent_products = products.len(),
                warehouses = warehouses.len(),
                "PostgreSQL store ready"
            );

            let watcher = tokio::spawn(metrics::watch_store(
                store,
                health,
                Duration::from_secs(config.health_check_secs),
            ));

            tracing::info!("✅ Ready. Press Ctrl+C to stop");
            tokio::signal::ctrl_c().await?;
            watcher.abort();
        }
        None => {
            tracing::info!("DATABASE_URL not set, running the walkthrough on the in-memory store");
            let store = Arc::new(MemoryStore::new());
            let seed = seed(&store).await;
            metrics::check_store(store.as_ref(), &health).await;
            walkthrough(store, metrics, &config, seed).await?;
        }
    }

    tracing::info!("👋 Shutting down");
    Ok(())
}

struct Seed {
    customer_id: Uuid,
    warehouse_id: Uuid,
}

async fn seed(store: &MemoryStore) -> Seed {
    let customer_id = Uuid::new_v4();
    store
        .add_customer(B2bCustomer {
            id: customer_id,
            customer_code: "C-ACME".into(),
            company_name: "Acme Retail".into(),
            currency: "KRW".into(),
            payment_terms: Some("NET30".into()),
            is_active: true,
        })
        .await;

    for (parent_sku, name) in [("TEE-01", "Basic Tee"), ("HOOD-02", "Zip Hoodie")] {
        store
            .add_parent_product(ParentProduct {
                parent_sku: parent_sku.into(),
                product_name: name.into(),
                category: Some("apparel".into()),
            })
            .await;
    }

    let warehouse_id = Uuid::new_v4();
    store
        .add_warehouse(Warehouse {
            id: warehouse_id,
            code: "WH-SEOUL".into(),
            name: "Seoul DC".into(),
            is_active: true,
        })
        .await;

    for (sku, color, size, on_hand) in [
        ("TEE-01-BLK-M", "Black", "M", 40),
        ("TEE-01-WHT-M", "White", "M", 4),
    ] {
        store
            .add_child_sku(ChildSku {
                product_id: Uuid::new_v4(),
                sku: sku.into(),
                parent_sku: "TEE-01".into(),
                product_name: "Basic Tee".into(),
                color: Some(color.into()),
                size: Some(size.into()),
            })
            .await;
        store.set_stock(warehouse_id, sku, on_hand).await;
    }

    Seed {
        customer_id,
        warehouse_id,
    }
}

/// Price list → order → shipment → ship, reporting each step as an ActionResult
async fn walkthrough(
    store: Arc<MemoryStore>,
    metrics: Arc<metrics::Metrics>,
    config: &Config,
    seed: Seed,
) -> anyhow::Result<()> {
    let today = Utc::now().date_naive();
    let store: Arc<dyn B2bStore> = store;
    let prices = CustomerPriceCommandHandler::new(store.clone(), metrics.clone());
    let orders = OrderCommandHandler::new(store.clone(), metrics.clone());
    let shipments =
        ShipmentCommandHandler::new(store.clone(), metrics.clone(), config.low_stock_threshold);

    // === Price list ===
    let csv = "parent_sku,unit_price,notes\nTEE-01,12000,spring deal\nHOOD-02,\"38000\",\nGHOST-9,1000,\n";
    let imported = prices.import_csv(seed.customer_id, csv).await;
    report(match &imported {
        Ok(outcome) => ActionResult::ok(outcome.message()),
        Err(e) => ActionResult::from_error(e),
    });

    let bulk = prices
        .bulk_upsert(
            seed.customer_id,
            &[
                ("HOOD-02".to_string(), "36000".to_string()),
                (String::new(), "100".to_string()),
            ],
        )
        .await;
    report(match &bulk {
        Ok(outcome) => ActionResult::ok(outcome.message()),
        Err(e) => ActionResult::from_error(e),
    });

    let duplicate = prices
        .add_price(seed.customer_id, "TEE-01", "11000", None)
        .await;
    report(ActionResult::from_result(&duplicate, "Price registered"));

    // === Order ===
    let mut order = orders.create_draft(today).await?;
    orders.attach_customer(&mut order, seed.customer_id).await?;
    for (parent_sku, name, quantity) in [
        ("TEE-01", "Basic Tee", 30),
        ("HOOD-02", "Zip Hoodie", 5),
        ("TEE-01", "Basic Tee", 10),
    ] {
        orders.apply(
            &mut order,
            &OrderCommand::AddLine {
                parent_sku: parent_sku.into(),
                product_name: name.into(),
                quantity,
            },
        )?;
    }
    orders.apply(
        &mut order,
        &OrderCommand::SetAdjustment {
            field: AdjustmentField::ShippingCost,
            raw: "5000".into(),
        },
    )?;
    let saved = orders.save(&order).await;
    report(ActionResult::from_result(&saved, format!("Order {} saved", order.order_number)));
    saved?;

    orders
        .change_status(order.id, StatusEvent::Selected(OrderStatus::Confirmed))
        .await?;
    tracing::info!(
        order_number = %order.order_number,
        total = %order.totals.total,
        "Order confirmed"
    );

    // === Shipment ===
    let mut workspace = shipments.open_draft(order.id).await?;
    tracing::debug!(
        taken_at = %workspace.snapshot_taken_at(),
        age_ms = workspace.snapshot_age(Utc::now()).num_milliseconds(),
        "Stock snapshot"
    );
    shipments.apply(&mut workspace, &ShipmentCommand::SelectWarehouse(seed.warehouse_id))?;
    for (sku, quantity) in [("TEE-01-BLK-M", 25), ("TEE-01-WHT-M", 10)] {
        let command = workspace.add_sku(sku, quantity)?;
        shipments.apply(&mut workspace, &command)?;
    }
    if let Some(hoodie) = workspace.report().line("HOOD-02") {
        tracing::info!(no_skus = hoodie.no_skus, remaining = hoodie.remaining, "HOOD-02 cannot be shipped yet");
    }

    let committed = shipments.commit(&workspace, today).await;
    report(ActionResult::from_result(&committed, "Shipment created"));
    let shipment = committed?;

    let shipped = shipments
        .change_status(
            shipment.header.id,
            ShipmentStatus::Shipped,
            Some("TRK-0001".into()),
            today,
        )
        .await;
    report(ActionResult::from_result(&shipped, "Shipment shipped"));
    shipped?;

    // === Reconciliation ===
    let workspace = shipments.open_draft(order.id).await?;
    println!("{}", serde_json::to_string_pretty(&workspace.report())?);

    println!("{}", prices.export_csv(seed.customer_id).await?);

    let order = orders.load(order.id).await?;
    tracing::info!(
        order_number = %order.order_number,
        status = %order.status,
        total = %order.totals.total,
        "Walkthrough finished"
    );
    Ok(())
}

fn report(result: ActionResult) {
    match serde_json::to_string(&result) {
        Ok(json) => println!("{json}"),
        Err(e) => tracing::error!(error = %e, "Failed to render action result"),
    }
}
