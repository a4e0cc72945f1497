use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{B2bStore, StoreError, StoreResult};
use crate::domain::customer_price::{B2bCustomer, CustomerPrice};
use crate::domain::order::OrderAggregate;
use crate::domain::shipment::{
    ChildSku, InventoryAdjustment, InventoryLocation, ParentProduct, Shipment, ShipmentHeader,
    ShipmentLine, Warehouse,
};

// ============================================================================
// In-Memory Store - demo runs and tests
// ============================================================================
//
// One mutex over all tables, so every call is atomic. `fail_next` makes the
// next N calls at a fail point return a transient error.
//
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    SaveOrder,
    UpsertCustomerPrice,
    AdjustInventory,
    InsertShipmentHeader,
    InsertShipmentLines,
    DeleteShipment,
}

impl FailPoint {
    fn name(&self) -> &'static str {
        match self {
            FailPoint::SaveOrder => "save_order",
            FailPoint::UpsertCustomerPrice => "upsert_customer_price",
            FailPoint::AdjustInventory => "adjust_inventory",
            FailPoint::InsertShipmentHeader => "insert_shipment_header",
            FailPoint::InsertShipmentLines => "insert_shipment_lines",
            FailPoint::DeleteShipment => "delete_shipment",
        }
    }
}

#[derive(Default)]
struct Tables {
    orders: BTreeMap<Uuid, OrderAggregate>,
    customers: HashMap<Uuid, B2bCustomer>,
    prices: BTreeMap<Uuid, CustomerPrice>,
    parent_products: Vec<ParentProduct>,
    child_skus: Vec<ChildSku>,
    warehouses: Vec<Warehouse>,
    stock: HashMap<(Uuid, String), i32>,
    movements: Vec<InventoryAdjustment>,
    shipments: BTreeMap<Uuid, ShipmentHeader>,
    shipment_lines: HashMap<Uuid, Vec<ShipmentLine>>,
    failures: HashMap<FailPoint, u32>,
}

impl Tables {
    fn trip(&mut self, point: FailPoint) -> StoreResult<()> {
        match self.failures.get_mut(&point) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                Err(StoreError::Injected(point.name()))
            }
            _ => Ok(()),
        }
    }

    fn shipment(&self, header: &ShipmentHeader) -> Shipment {
        Shipment {
            header: header.clone(),
            lines: self
                .shipment_lines
                .get(&header.id)
                .cloned()
                .unwrap_or_default(),
        }
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn fail_next(&self, point: FailPoint, times: u32) {
        self.tables.lock().await.failures.insert(point, times);
    }

    pub async fn add_customer(&self, customer: B2bCustomer) {
        self.tables.lock().await.customers.insert(customer.id, customer);
    }

    pub async fn add_parent_product(&self, product: ParentProduct) {
        self.tables.lock().await.parent_products.push(product);
    }

    pub async fn add_child_sku(&self, child: ChildSku) {
        self.tables.lock().await.child_skus.push(child);
    }

    pub async fn add_warehouse(&self, warehouse: Warehouse) {
        self.tables.lock().await.warehouses.push(warehouse);
    }

    pub async fn set_stock(&self, warehouse_id: Uuid, sku: &str, quantity: i32) {
        self.tables
            .lock()
            .await
            .stock
            .insert((warehouse_id, sku.to_string()), quantity);
    }

    pub async fn stock(&self, warehouse_id: Uuid, sku: &str) -> i32 {
        self.tables
            .lock()
            .await
            .stock
            .get(&(warehouse_id, sku.to_string()))
            .copied()
            .unwrap_or(0)
    }

    pub async fn movements(&self) -> Vec<InventoryAdjustment> {
        self.tables.lock().await.movements.clone()
    }
}

#[async_trait]
impl B2bStore for MemoryStore {
    async fn count_orders_with_prefix(&self, prefix: &str) -> StoreResult<i64> {
        let tables = self.tables.lock().await;
        Ok(tables
            .orders
            .values()
            .filter(|o| o.order_number.starts_with(prefix))
            .count() as i64)
    }

    async fn count_shipments_with_prefix(&self, prefix: &str) -> StoreResult<i64> {
        let tables = self.tables.lock().await;
        Ok(tables
            .shipments
            .values()
            .filter(|s| s.shipment_number.starts_with(prefix))
            .count() as i64)
    }

    async fn load_order(&self, order_id: Uuid) -> StoreResult<OrderAggregate> {
        self.tables
            .lock()
            .await
            .orders
            .get(&order_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("order", order_id))
    }

    async fn save_order(&self, order: &OrderAggregate) -> StoreResult<()> {
        let mut tables = self.tables.lock().await;
        tables.trip(FailPoint::SaveOrder)?;
        let duplicate_number = tables
            .orders
            .values()
            .any(|o| o.id != order.id && o.order_number == order.order_number);
        if duplicate_number {
            return Err(StoreError::UniqueViolation {
                constraint: "b2b_orders_order_number_key".to_string(),
            });
        }
        tables.orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn delete_order(&self, order_id: Uuid) -> StoreResult<()> {
        let mut tables = self.tables.lock().await;
        if tables.orders.remove(&order_id).is_none() {
            return Err(StoreError::not_found("order", order_id));
        }
        let shipment_ids: Vec<Uuid> = tables
            .shipments
            .values()
            .filter(|s| s.order_id == order_id)
            .map(|s| s.id)
            .collect();
        for id in shipment_ids {
            tables.shipments.remove(&id);
            tables.shipment_lines.remove(&id);
        }
        Ok(())
    }

    async fn customer(&self, customer_id: Uuid) -> StoreResult<Option<B2bCustomer>> {
        Ok(self.tables.lock().await.customers.get(&customer_id).cloned())
    }

    async fn customer_prices(&self, customer_id: Uuid) -> StoreResult<Vec<CustomerPrice>> {
        let tables = self.tables.lock().await;
        let mut prices: Vec<CustomerPrice> = tables
            .prices
            .values()
            .filter(|p| p.customer_id == customer_id)
            .cloned()
            .collect();
        prices.sort_by(|a, b| a.parent_sku.cmp(&b.parent_sku));
        Ok(prices)
    }

    async fn insert_customer_price(&self, price: &CustomerPrice) -> StoreResult<()> {
        let mut tables = self.tables.lock().await;
        let exists = tables
            .prices
            .values()
            .any(|p| p.customer_id == price.customer_id && p.parent_sku == price.parent_sku);
        if exists {
            return Err(StoreError::UniqueViolation {
                constraint: "b2b_customer_prices_customer_id_parent_sku_key".to_string(),
            });
        }
        tables.prices.insert(price.id, price.clone());
        Ok(())
    }

    async fn upsert_customer_price(&self, price: &CustomerPrice) -> StoreResult<()> {
        let mut tables = self.tables.lock().await;
        tables.trip(FailPoint::UpsertCustomerPrice)?;
        let existing_id = tables
            .prices
            .values()
            .find(|p| p.customer_id == price.customer_id && p.parent_sku == price.parent_sku)
            .map(|p| p.id);
        let row = CustomerPrice {
            id: existing_id.unwrap_or(price.id),
            ..price.clone()
        };
        tables.prices.insert(row.id, row);
        Ok(())
    }

    async fn delete_customer_price(&self, price_id: Uuid) -> StoreResult<()> {
        self.tables
            .lock()
            .await
            .prices
            .remove(&price_id)
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found("customer price", price_id))
    }

    async fn parent_products(&self) -> StoreResult<Vec<ParentProduct>> {
        Ok(self.tables.lock().await.parent_products.clone())
    }

    async fn child_skus(&self, parent_skus: &[String]) -> StoreResult<Vec<ChildSku>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .child_skus
            .iter()
            .filter(|c| parent_skus.contains(&c.parent_sku))
            .cloned()
            .collect())
    }

    async fn warehouses(&self) -> StoreResult<Vec<Warehouse>> {
        Ok(self.tables.lock().await.warehouses.clone())
    }

    async fn inventory_locations(&self, skus: &[String]) -> StoreResult<Vec<InventoryLocation>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .stock
            .iter()
            .filter(|((_, sku), _)| skus.contains(sku))
            .map(|((warehouse_id, sku), quantity)| InventoryLocation {
                warehouse_id: *warehouse_id,
                sku: sku.clone(),
                quantity: *quantity,
            })
            .collect())
    }

    async fn adjust_inventory(&self, adjustment: &InventoryAdjustment) -> StoreResult<()> {
        let mut tables = self.tables.lock().await;
        tables.trip(FailPoint::AdjustInventory)?;
        *tables
            .stock
            .entry((adjustment.warehouse_id, adjustment.sku.clone()))
            .or_insert(0) += adjustment.delta;
        tables.movements.push(adjustment.clone());
        Ok(())
    }

    async fn shipments_for_order(&self, order_id: Uuid) -> StoreResult<Vec<Shipment>> {
        let tables = self.tables.lock().await;
        let mut shipments: Vec<Shipment> = tables
            .shipments
            .values()
            .filter(|s| s.order_id == order_id)
            .map(|s| tables.shipment(s))
            .collect();
        shipments.sort_by_key(|s| s.header.created_at);
        Ok(shipments)
    }

    async fn load_shipment(&self, shipment_id: Uuid) -> StoreResult<Shipment> {
        let tables = self.tables.lock().await;
        tables
            .shipments
            .get(&shipment_id)
            .map(|s| tables.shipment(s))
            .ok_or_else(|| StoreError::not_found("shipment", shipment_id))
    }

    async fn insert_shipment_header(&self, header: &ShipmentHeader) -> StoreResult<()> {
        let mut tables = self.tables.lock().await;
        tables.trip(FailPoint::InsertShipmentHeader)?;
        if !tables.orders.contains_key(&header.order_id) {
            return Err(StoreError::not_found("order", header.order_id));
        }
        if tables
            .shipments
            .values()
            .any(|s| s.shipment_number == header.shipment_number)
        {
            return Err(StoreError::UniqueViolation {
                constraint: "b2b_shipments_shipment_number_key".to_string(),
            });
        }
        tables.shipments.insert(header.id, header.clone());
        Ok(())
    }

    async fn insert_shipment_lines(&self, shipment_id: Uuid, lines: &[ShipmentLine]) -> StoreResult<()> {
        let mut tables = self.tables.lock().await;
        tables.trip(FailPoint::InsertShipmentLines)?;
        if !tables.shipments.contains_key(&shipment_id) {
            return Err(StoreError::not_found("shipment", shipment_id));
        }
        tables
            .shipment_lines
            .entry(shipment_id)
            .or_default()
            .extend(lines.iter().cloned());
        Ok(())
    }

    async fn delete_shipment(&self, shipment_id: Uuid) -> StoreResult<()> {
        let mut tables = self.tables.lock().await;
        tables.trip(FailPoint::DeleteShipment)?;
        if tables.shipments.remove(&shipment_id).is_none() {
            return Err(StoreError::not_found("shipment", shipment_id));
        }
        tables.shipment_lines.remove(&shipment_id);
        Ok(())
    }

    async fn update_shipment_header(&self, header: &ShipmentHeader) -> StoreResult<()> {
        let mut tables = self.tables.lock().await;
        match tables.shipments.get_mut(&header.id) {
            Some(row) => {
                *row = header.clone();
                Ok(())
            }
            None => Err(StoreError::not_found("shipment", header.id)),
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use rust_decimal::Decimal;

    fn header(order_id: Uuid, number: &str) -> ShipmentHeader {
        ShipmentHeader {
            id: Uuid::now_v7(),
            order_id,
            shipment_number: number.to_string(),
            warehouse_id: Uuid::new_v4(),
            status: crate::domain::shipment::ShipmentStatus::Pending,
            planned_date: None,
            shipped_date: None,
            shipping_method: None,
            carrier_name: None,
            tracking_number: None,
            shipping_cost: Decimal::ZERO,
            notes: None,
            created_at: Utc::now(),
        }
    }

    async fn saved_order(store: &MemoryStore) -> OrderAggregate {
        let order = OrderAggregate::draft(
            "B2B-20260101-0001",
            NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
        );
        store.save_order(&order).await.unwrap();
        order
    }

    #[tokio::test]
    async fn test_fail_next_trips_exactly_n_times() {
        let store = MemoryStore::new();
        let order = saved_order(&store).await;
        store.fail_next(FailPoint::InsertShipmentHeader, 2).await;

        let h = header(order.id, "SHP-20260101-0001");
        assert!(matches!(
            store.insert_shipment_header(&h).await,
            Err(StoreError::Injected("insert_shipment_header"))
        ));
        assert!(store.insert_shipment_header(&h).await.is_err());
        assert!(store.insert_shipment_header(&h).await.is_ok());
    }

    #[tokio::test]
    async fn test_duplicate_shipment_number_is_unique_violation() {
        let store = MemoryStore::new();
        let order = saved_order(&store).await;
        store
            .insert_shipment_header(&header(order.id, "SHP-20260101-0001"))
            .await
            .unwrap();
        assert!(matches!(
            store
                .insert_shipment_header(&header(order.id, "SHP-20260101-0001"))
                .await,
            Err(StoreError::UniqueViolation { .. })
        ));
    }

    #[tokio::test]
    async fn test_shipment_requires_existing_order() {
        let store = MemoryStore::new();
        assert!(matches!(
            store
                .insert_shipment_header(&header(Uuid::new_v4(), "SHP-20260101-0001"))
                .await,
            Err(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_adjust_inventory_records_movement() {
        let store = MemoryStore::new();
        let warehouse = Uuid::new_v4();
        store.set_stock(warehouse, "A", 10).await;
        store
            .adjust_inventory(&InventoryAdjustment {
                warehouse_id: warehouse,
                sku: "A".to_string(),
                delta: -4,
                reason: "shipment SHP-1 shipped".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(store.stock(warehouse, "A").await, 6);
        assert_eq!(store.movements().await.len(), 1);
    }

    #[tokio::test]
    async fn test_counts_by_prefix() {
        let store = MemoryStore::new();
        saved_order(&store).await;
        assert_eq!(store.count_orders_with_prefix("B2B-20260101-").await.unwrap(), 1);
        assert_eq!(store.count_orders_with_prefix("B2B-20260102-").await.unwrap(), 0);
    }
}
