use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use super::{B2bStore, StoreError, StoreResult};
use crate::domain::customer_price::{B2bCustomer, CustomerPrice, PriceBook};
use crate::domain::order::{
    recompute_order_totals, Adjustments, OrderAggregate, OrderLine, OrderStatus, PaymentStatus,
};
use crate::domain::shipment::{
    ChildSku, InventoryAdjustment, InventoryLocation, ParentProduct, Shipment, ShipmentHeader,
    ShipmentLine, ShipmentStatus, Warehouse,
};

// ============================================================================
// PostgreSQL Store (sqlx)
// ============================================================================
//
// Every multi-statement write runs inside one transaction. Totals are not
// trusted on read: they are recomputed from lines and adjustments.
//
// ============================================================================

pub struct PgStore {
    pool: PgPool,
}

fn decode_error(message: String) -> StoreError {
    StoreError::Database(sqlx::Error::Decode(message.into()))
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    order_number: String,
    customer_id: Option<Uuid>,
    currency: String,
    status: String,
    payment_status: String,
    payment_terms: Option<String>,
    order_date: NaiveDate,
    quote_valid_until: Option<NaiveDate>,
    shipping_address: Option<String>,
    internal_notes: Option<String>,
    customer_notes: Option<String>,
    discount_amount: Decimal,
    shipping_cost: Decimal,
    tax_amount: Decimal,
    confirmed_at: Option<DateTime<Utc>>,
    shipped_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    id: Uuid,
    parent_sku: String,
    product_name: String,
    quantity: i32,
    unit_price: Decimal,
    discount_rate: Decimal,
    line_total: Decimal,
    notes: Option<String>,
}

impl From<OrderItemRow> for OrderLine {
    fn from(row: OrderItemRow) -> Self {
        let mut line = OrderLine {
            id: row.id,
            parent_sku: row.parent_sku,
            product_name: row.product_name,
            quantity: row.quantity,
            unit_price: row.unit_price,
            discount_rate: row.discount_rate,
            line_total: row.line_total,
            notes: row.notes,
        };
        line.recompute();
        line
    }
}

#[derive(sqlx::FromRow)]
struct CustomerPriceRow {
    id: Uuid,
    customer_id: Uuid,
    parent_sku: String,
    unit_price: Decimal,
    currency: String,
    notes: Option<String>,
}

impl From<CustomerPriceRow> for CustomerPrice {
    fn from(row: CustomerPriceRow) -> Self {
        CustomerPrice {
            id: row.id,
            customer_id: row.customer_id,
            parent_sku: row.parent_sku,
            unit_price: row.unit_price,
            currency: row.currency,
            notes: row.notes,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ShipmentRow {
    id: Uuid,
    order_id: Uuid,
    shipment_number: String,
    warehouse_id: Uuid,
    status: String,
    planned_date: Option<NaiveDate>,
    shipped_date: Option<NaiveDate>,
    shipping_method: Option<String>,
    carrier_name: Option<String>,
    tracking_number: Option<String>,
    shipping_cost: Decimal,
    notes: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<ShipmentRow> for ShipmentHeader {
    type Error = StoreError;

    fn try_from(row: ShipmentRow) -> Result<Self, Self::Error> {
        let status = ShipmentStatus::parse(&row.status)
            .ok_or_else(|| decode_error(format!("unknown shipment status {}", row.status)))?;
        Ok(ShipmentHeader {
            id: row.id,
            order_id: row.order_id,
            shipment_number: row.shipment_number,
            warehouse_id: row.warehouse_id,
            status,
            planned_date: row.planned_date,
            shipped_date: row.shipped_date,
            shipping_method: row.shipping_method,
            carrier_name: row.carrier_name,
            tracking_number: row.tracking_number,
            shipping_cost: row.shipping_cost,
            notes: row.notes,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ShipmentItemRow {
    id: Uuid,
    shipment_id: Uuid,
    order_item_id: Option<Uuid>,
    sku: String,
    quantity: i32,
    box_number: Option<i32>,
    product_name: String,
    color: Option<String>,
    size: Option<String>,
}

impl From<ShipmentItemRow> for ShipmentLine {
    fn from(row: ShipmentItemRow) -> Self {
        ShipmentLine {
            id: row.id,
            order_line_id: row.order_item_id,
            sku: row.sku,
            quantity: row.quantity,
            box_number: row.box_number,
            product_name: row.product_name,
            color: row.color,
            size: row.size,
            stock: None,
        }
    }
}

const SHIPMENT_COLUMNS: &str = "id, order_id, shipment_number, warehouse_id, status, planned_date, \
     shipped_date, shipping_method, carrier_name, tracking_number, shipping_cost, notes, created_at";

const SHIPMENT_ITEM_COLUMNS: &str =
    "id, shipment_id, order_item_id, sku, quantity, box_number, product_name, color, size";

impl PgStore {
    /// Connect and bring the schema up to date
    pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!(max_connections, "Connected to PostgreSQL");

        Ok(Self { pool })
    }

    async fn attach_lines(&self, headers: Vec<ShipmentRow>) -> StoreResult<Vec<Shipment>> {
        let ids: Vec<Uuid> = headers.iter().map(|h| h.id).collect();
        let items: Vec<ShipmentItemRow> = sqlx::query_as(&format!(
            "SELECT {SHIPMENT_ITEM_COLUMNS} FROM b2b_shipment_items \
             WHERE shipment_id = ANY($1) ORDER BY line_no"
        ))
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut lines: HashMap<Uuid, Vec<ShipmentLine>> = HashMap::new();
        for item in items {
            lines.entry(item.shipment_id).or_default().push(item.into());
        }

        headers
            .into_iter()
            .map(|row| {
                let lines = lines.remove(&row.id).unwrap_or_default();
                Ok(Shipment {
                    header: row.try_into()?,
                    lines,
                })
            })
            .collect()
    }
}

#[async_trait]
impl B2bStore for PgStore {
    async fn count_orders_with_prefix(&self, prefix: &str) -> StoreResult<i64> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM b2b_orders WHERE order_number LIKE $1 || '%'")
                .bind(prefix)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    async fn count_shipments_with_prefix(&self, prefix: &str) -> StoreResult<i64> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM b2b_shipments WHERE shipment_number LIKE $1 || '%'")
                .bind(prefix)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    async fn load_order(&self, order_id: Uuid) -> StoreResult<OrderAggregate> {
        let row: OrderRow = sqlx::query_as(
            r#"
            SELECT id, order_number, customer_id, currency, status, payment_status,
                   payment_terms, order_date, quote_valid_until, shipping_address,
                   internal_notes, customer_notes, discount_amount, shipping_cost,
                   tax_amount, confirmed_at, shipped_at, created_at, updated_at
            FROM b2b_orders
            WHERE id = $1
            "#,
        )
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::not_found("order", order_id))?;

        let items: Vec<OrderItemRow> = sqlx::query_as(
            r#"
            SELECT id, parent_sku, product_name, quantity, unit_price,
                   discount_rate, line_total, notes
            FROM b2b_order_items
            WHERE order_id = $1
            ORDER BY line_no
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        let price_book: PriceBook = match row.customer_id {
            Some(customer_id) => self.customer_prices(customer_id).await?.iter().collect(),
            None => PriceBook::new(),
        };

        let status = OrderStatus::parse(&row.status)
            .ok_or_else(|| decode_error(format!("unknown order status {}", row.status)))?;
        let payment_status = PaymentStatus::parse(&row.payment_status).ok_or_else(|| {
            decode_error(format!("unknown payment status {}", row.payment_status))
        })?;

        let lines: Vec<OrderLine> = items.into_iter().map(OrderLine::from).collect();
        let adjustments = Adjustments {
            discount_amount: row.discount_amount,
            shipping_cost: row.shipping_cost,
            tax_amount: row.tax_amount,
        };
        let totals = recompute_order_totals(&lines, &adjustments);

        Ok(OrderAggregate {
            id: row.id,
            order_number: row.order_number,
            customer_id: row.customer_id,
            currency: row.currency,
            status,
            payment_status,
            payment_terms: row.payment_terms,
            order_date: row.order_date,
            quote_valid_until: row.quote_valid_until,
            shipping_address: row.shipping_address,
            internal_notes: row.internal_notes,
            customer_notes: row.customer_notes,
            lines,
            adjustments,
            totals,
            price_book,
            confirmed_at: row.confirmed_at,
            shipped_at: row.shipped_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }

    async fn save_order(&self, order: &OrderAggregate) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO b2b_orders (
                id, order_number, customer_id, currency, status, payment_status,
                payment_terms, order_date, quote_valid_until, shipping_address,
                internal_notes, customer_notes, subtotal, discount_amount,
                shipping_cost, tax_amount, total, confirmed_at, shipped_at,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                    $15, $16, $17, $18, $19, $20, $21)
            ON CONFLICT (id)
            DO UPDATE SET
                customer_id = EXCLUDED.customer_id, currency = EXCLUDED.currency,
                status = EXCLUDED.status, payment_status = EXCLUDED.payment_status,
                payment_terms = EXCLUDED.payment_terms, order_date = EXCLUDED.order_date,
                quote_valid_until = EXCLUDED.quote_valid_until,
                shipping_address = EXCLUDED.shipping_address,
                internal_notes = EXCLUDED.internal_notes,
                customer_notes = EXCLUDED.customer_notes,
                subtotal = EXCLUDED.subtotal, discount_amount = EXCLUDED.discount_amount,
                shipping_cost = EXCLUDED.shipping_cost, tax_amount = EXCLUDED.tax_amount,
                total = EXCLUDED.total, confirmed_at = EXCLUDED.confirmed_at,
                shipped_at = EXCLUDED.shipped_at, updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(order.id)
        .bind(&order.order_number)
        .bind(order.customer_id)
        .bind(&order.currency)
        .bind(order.status.as_str())
        .bind(order.payment_status.as_str())
        .bind(&order.payment_terms)
        .bind(order.order_date)
        .bind(order.quote_valid_until)
        .bind(&order.shipping_address)
        .bind(&order.internal_notes)
        .bind(&order.customer_notes)
        .bind(order.totals.subtotal)
        .bind(order.adjustments.discount_amount)
        .bind(order.adjustments.shipping_cost)
        .bind(order.adjustments.tax_amount)
        .bind(order.totals.total)
        .bind(order.confirmed_at)
        .bind(order.shipped_at)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *tx)
        .await?;

        // Replace the line set; surviving lines keep their ids so shipment
        // lines stay linked to them
        let line_ids: Vec<Uuid> = order.lines.iter().map(|l| l.id).collect();
        sqlx::query("DELETE FROM b2b_order_items WHERE order_id = $1 AND NOT (id = ANY($2))")
            .bind(order.id)
            .bind(&line_ids)
            .execute(&mut *tx)
            .await?;

        for (line_no, line) in order.lines.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO b2b_order_items (
                    id, order_id, line_no, parent_sku, product_name, quantity,
                    unit_price, discount_rate, line_total, notes
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                ON CONFLICT (id)
                DO UPDATE SET
                    line_no = EXCLUDED.line_no, parent_sku = EXCLUDED.parent_sku,
                    product_name = EXCLUDED.product_name, quantity = EXCLUDED.quantity,
                    unit_price = EXCLUDED.unit_price, discount_rate = EXCLUDED.discount_rate,
                    line_total = EXCLUDED.line_total, notes = EXCLUDED.notes
                "#,
            )
            .bind(line.id)
            .bind(order.id)
            .bind(line_no as i32)
            .bind(&line.parent_sku)
            .bind(&line.product_name)
            .bind(line.quantity)
            .bind(line.unit_price)
            .bind(line.discount_rate)
            .bind(line.line_total)
            .bind(&line.notes)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn delete_order(&self, order_id: Uuid) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM b2b_orders WHERE id = $1")
            .bind(order_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("order", order_id));
        }
        Ok(())
    }

    async fn customer(&self, customer_id: Uuid) -> StoreResult<Option<B2bCustomer>> {
        let row: Option<(Uuid, String, String, String, Option<String>, bool)> = sqlx::query_as(
            "SELECT id, customer_code, company_name, currency, payment_terms, is_active \
             FROM b2b_customers WHERE id = $1",
        )
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(
            |(id, customer_code, company_name, currency, payment_terms, is_active)| B2bCustomer {
                id,
                customer_code,
                company_name,
                currency,
                payment_terms,
                is_active,
            },
        ))
    }

    async fn customer_prices(&self, customer_id: Uuid) -> StoreResult<Vec<CustomerPrice>> {
        let rows: Vec<CustomerPriceRow> = sqlx::query_as(
            "SELECT id, customer_id, parent_sku, unit_price, currency, notes \
             FROM b2b_customer_prices WHERE customer_id = $1 ORDER BY parent_sku",
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(CustomerPrice::from).collect())
    }

    async fn insert_customer_price(&self, price: &CustomerPrice) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO b2b_customer_prices (id, customer_id, parent_sku, unit_price, currency, notes) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(price.id)
        .bind(price.customer_id)
        .bind(&price.parent_sku)
        .bind(price.unit_price)
        .bind(&price.currency)
        .bind(&price.notes)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn upsert_customer_price(&self, price: &CustomerPrice) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO b2b_customer_prices (id, customer_id, parent_sku, unit_price, currency, notes)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (customer_id, parent_sku)
            DO UPDATE SET
                unit_price = EXCLUDED.unit_price, currency = EXCLUDED.currency,
                notes = EXCLUDED.notes, updated_at = now()
            "#,
        )
        .bind(price.id)
        .bind(price.customer_id)
        .bind(&price.parent_sku)
        .bind(price.unit_price)
        .bind(&price.currency)
        .bind(&price.notes)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_customer_price(&self, price_id: Uuid) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM b2b_customer_prices WHERE id = $1")
            .bind(price_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("customer price", price_id));
        }
        Ok(())
    }

    async fn parent_products(&self) -> StoreResult<Vec<ParentProduct>> {
        let rows: Vec<(String, String, Option<String>)> = sqlx::query_as(
            "SELECT parent_sku, product_name, category FROM parent_products ORDER BY parent_sku",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(parent_sku, product_name, category)| ParentProduct {
                parent_sku,
                product_name,
                category,
            })
            .collect())
    }

    async fn child_skus(&self, parent_skus: &[String]) -> StoreResult<Vec<ChildSku>> {
        let rows: Vec<(Uuid, String, String, String, Option<String>, Option<String>)> =
            sqlx::query_as(
                "SELECT id, sku, parent_sku, product_name, color, size \
                 FROM products WHERE parent_sku = ANY($1) ORDER BY sku",
            )
            .bind(parent_skus)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|(product_id, sku, parent_sku, product_name, color, size)| ChildSku {
                product_id,
                sku,
                parent_sku,
                product_name,
                color,
                size,
            })
            .collect())
    }

    async fn warehouses(&self) -> StoreResult<Vec<Warehouse>> {
        let rows: Vec<(Uuid, String, String, bool)> =
            sqlx::query_as("SELECT id, code, name, is_active FROM warehouses ORDER BY code")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows
            .into_iter()
            .map(|(id, code, name, is_active)| Warehouse {
                id,
                code,
                name,
                is_active,
            })
            .collect())
    }

    async fn inventory_locations(&self, skus: &[String]) -> StoreResult<Vec<InventoryLocation>> {
        let rows: Vec<(Uuid, String, i32)> = sqlx::query_as(
            "SELECT warehouse_id, sku, quantity FROM inventory_locations WHERE sku = ANY($1)",
        )
        .bind(skus)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(warehouse_id, sku, quantity)| InventoryLocation {
                warehouse_id,
                sku,
                quantity,
            })
            .collect())
    }

    async fn adjust_inventory(&self, adjustment: &InventoryAdjustment) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO inventory_locations (warehouse_id, sku, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (warehouse_id, sku)
            DO UPDATE SET
                quantity = inventory_locations.quantity + EXCLUDED.quantity,
                updated_at = now()
            "#,
        )
        .bind(adjustment.warehouse_id)
        .bind(&adjustment.sku)
        .bind(adjustment.delta)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO inventory_movements (id, warehouse_id, sku, delta, reason) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(Uuid::now_v7())
        .bind(adjustment.warehouse_id)
        .bind(&adjustment.sku)
        .bind(adjustment.delta)
        .bind(&adjustment.reason)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn shipments_for_order(&self, order_id: Uuid) -> StoreResult<Vec<Shipment>> {
        let headers: Vec<ShipmentRow> = sqlx::query_as(&format!(
            "SELECT {SHIPMENT_COLUMNS} FROM b2b_shipments WHERE order_id = $1 ORDER BY created_at"
        ))
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;
        self.attach_lines(headers).await
    }

    async fn load_shipment(&self, shipment_id: Uuid) -> StoreResult<Shipment> {
        let header: ShipmentRow = sqlx::query_as(&format!(
            "SELECT {SHIPMENT_COLUMNS} FROM b2b_shipments WHERE id = $1"
        ))
        .bind(shipment_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::not_found("shipment", shipment_id))?;

        self.attach_lines(vec![header])
            .await?
            .pop()
            .ok_or_else(|| StoreError::not_found("shipment", shipment_id))
    }

    async fn insert_shipment_header(&self, header: &ShipmentHeader) -> StoreResult<()> {
        sqlx::query(&format!(
            "INSERT INTO b2b_shipments ({SHIPMENT_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)"
        ))
        .bind(header.id)
        .bind(header.order_id)
        .bind(&header.shipment_number)
        .bind(header.warehouse_id)
        .bind(header.status.as_str())
        .bind(header.planned_date)
        .bind(header.shipped_date)
        .bind(&header.shipping_method)
        .bind(&header.carrier_name)
        .bind(&header.tracking_number)
        .bind(header.shipping_cost)
        .bind(&header.notes)
        .bind(header.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_shipment_lines(&self, shipment_id: Uuid, lines: &[ShipmentLine]) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        for (line_no, line) in lines.iter().enumerate() {
            sqlx::query(&format!(
                "INSERT INTO b2b_shipment_items ({SHIPMENT_ITEM_COLUMNS}, line_no) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"
            ))
            .bind(line.id)
            .bind(shipment_id)
            .bind(line.order_line_id)
            .bind(&line.sku)
            .bind(line.quantity)
            .bind(line.box_number)
            .bind(&line.product_name)
            .bind(&line.color)
            .bind(&line.size)
            .bind(line_no as i32)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn delete_shipment(&self, shipment_id: Uuid) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM b2b_shipments WHERE id = $1")
            .bind(shipment_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("shipment", shipment_id));
        }
        Ok(())
    }

    async fn update_shipment_header(&self, header: &ShipmentHeader) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE b2b_shipments SET
                status = $2, planned_date = $3, shipped_date = $4,
                shipping_method = $5, carrier_name = $6, tracking_number = $7,
                shipping_cost = $8, notes = $9
            WHERE id = $1
            "#,
        )
        .bind(header.id)
        .bind(header.status.as_str())
        .bind(header.planned_date)
        .bind(header.shipped_date)
        .bind(&header.shipping_method)
        .bind(&header.carrier_name)
        .bind(&header.tracking_number)
        .bind(header.shipping_cost)
        .bind(&header.notes)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("shipment", header.id));
        }
        Ok(())
    }
}
