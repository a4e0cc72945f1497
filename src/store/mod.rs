// ============================================================================
// Storage Seam - Everything the workflow reads from or writes to
// ============================================================================
//
// Multi-statement writes (order header + lines, stock level + movement)
// are atomic inside each implementation. The one cross-call sequence,
// shipment header then shipment lines, is compensated by the shipment
// command handler.
//
// ============================================================================

mod memory;
mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::customer_price::{B2bCustomer, CustomerPrice};
use crate::domain::order::OrderAggregate;
use crate::domain::shipment::{
    ChildSku, InventoryAdjustment, InventoryLocation, ParentProduct, Shipment, ShipmentHeader,
    ShipmentLine, Warehouse,
};
use crate::utils::IsTransient;

pub use memory::{FailPoint, MemoryStore};
pub use postgres::PgStore;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Duplicate value violates unique constraint {constraint}")]
    UniqueViolation { constraint: String },

    #[error("Database error: {0}")]
    Database(#[source] sqlx::Error),

    #[error("Injected failure at {0}")]
    Injected(&'static str),
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        StoreError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Map a sqlx error, pulling out PostgreSQL unique violations (23505)
    pub fn from_sqlx(error: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &error {
            if db.code().as_deref() == Some("23505") {
                return StoreError::UniqueViolation {
                    constraint: db.constraint().unwrap_or("unknown").to_string(),
                };
            }
        }
        StoreError::Database(error)
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(error: sqlx::Error) -> Self {
        StoreError::from_sqlx(error)
    }
}

impl IsTransient for StoreError {
    fn is_transient(&self) -> bool {
        match self {
            StoreError::Database(error) => matches!(
                error,
                sqlx::Error::Io(_)
                    | sqlx::Error::PoolTimedOut
                    | sqlx::Error::PoolClosed
                    | sqlx::Error::WorkerCrashed
            ),
            StoreError::Injected(_) => true,
            StoreError::NotFound { .. } | StoreError::UniqueViolation { .. } => false,
        }
    }
}

#[async_trait]
pub trait B2bStore: Send + Sync {
    // Numbering
    async fn count_orders_with_prefix(&self, prefix: &str) -> StoreResult<i64>;
    async fn count_shipments_with_prefix(&self, prefix: &str) -> StoreResult<i64>;

    // Orders
    async fn load_order(&self, order_id: Uuid) -> StoreResult<OrderAggregate>;
    /// Upsert the header and replace the full line list as one unit
    async fn save_order(&self, order: &OrderAggregate) -> StoreResult<()>;
    /// Cascades to the order's shipments and shipment lines
    async fn delete_order(&self, order_id: Uuid) -> StoreResult<()>;

    // Customers and prices
    async fn customer(&self, customer_id: Uuid) -> StoreResult<Option<B2bCustomer>>;
    async fn customer_prices(&self, customer_id: Uuid) -> StoreResult<Vec<CustomerPrice>>;
    async fn insert_customer_price(&self, price: &CustomerPrice) -> StoreResult<()>;
    /// Insert or update on (customer_id, parent_sku)
    async fn upsert_customer_price(&self, price: &CustomerPrice) -> StoreResult<()>;
    async fn delete_customer_price(&self, price_id: Uuid) -> StoreResult<()>;

    // Catalog and stock
    async fn parent_products(&self) -> StoreResult<Vec<ParentProduct>>;
    async fn child_skus(&self, parent_skus: &[String]) -> StoreResult<Vec<ChildSku>>;
    async fn warehouses(&self) -> StoreResult<Vec<Warehouse>>;
    async fn inventory_locations(&self, skus: &[String]) -> StoreResult<Vec<InventoryLocation>>;
    async fn adjust_inventory(&self, adjustment: &InventoryAdjustment) -> StoreResult<()>;

    // Shipments
    async fn shipments_for_order(&self, order_id: Uuid) -> StoreResult<Vec<Shipment>>;
    async fn load_shipment(&self, shipment_id: Uuid) -> StoreResult<Shipment>;
    async fn insert_shipment_header(&self, header: &ShipmentHeader) -> StoreResult<()>;
    async fn insert_shipment_lines(
        &self,
        shipment_id: Uuid,
        lines: &[ShipmentLine],
    ) -> StoreResult<()>;
    async fn delete_shipment(&self, shipment_id: Uuid) -> StoreResult<()>;
    async fn update_shipment_header(&self, header: &ShipmentHeader) -> StoreResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_transience() {
        assert!(StoreError::Injected("insert_shipment_lines").is_transient());
        assert!(StoreError::Database(sqlx::Error::PoolTimedOut).is_transient());
        assert!(!StoreError::Database(sqlx::Error::RowNotFound).is_transient());
        assert!(!StoreError::not_found("order", Uuid::nil()).is_transient());
        assert!(!StoreError::UniqueViolation {
            constraint: "b2b_customer_prices_customer_id_parent_sku_key".to_string()
        }
        .is_transient());
    }
}
