use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use super::value_objects::{ChildSku, InventoryLocation};

// ============================================================================
// SKU Catalog & Stock Snapshot
// ============================================================================
//
// Read-side views built once when a shipment form is opened:
// parent SKU -> child SKUs for the order's lines, and per-warehouse
// on-hand quantities. The snapshot is never refreshed before commit.
//
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct SkuCatalog {
    children: BTreeMap<String, Vec<ChildSku>>,
    parent_of: HashMap<String, String>,
}

impl SkuCatalog {
    /// One pass over the products, keeping children of the given parents.
    /// Every requested parent gets an entry, even with no children.
    pub fn build(products: impl IntoIterator<Item = ChildSku>, parent_skus: &[String]) -> Self {
        let mut children: BTreeMap<String, Vec<ChildSku>> = parent_skus
            .iter()
            .map(|p| (p.clone(), Vec::new()))
            .collect();
        let mut parent_of = HashMap::new();

        for product in products {
            if let Some(list) = children.get_mut(&product.parent_sku) {
                parent_of.insert(product.sku.clone(), product.parent_sku.clone());
                list.push(product);
            }
        }
        for list in children.values_mut() {
            list.sort_by(|a, b| a.sku.cmp(&b.sku));
            list.dedup_by(|a, b| a.sku == b.sku);
        }

        Self { children, parent_of }
    }

    pub fn children(&self, parent_sku: &str) -> &[ChildSku] {
        self.children
            .get(parent_sku)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Parent SKUs that have no child SKU registered
    pub fn parents_without_skus(&self) -> Vec<&str> {
        self.children
            .iter()
            .filter(|(_, list)| list.is_empty())
            .map(|(parent, _)| parent.as_str())
            .collect()
    }

    pub fn has_skus(&self, parent_sku: &str) -> bool {
        !self.children(parent_sku).is_empty()
    }

    pub fn parent_of(&self, sku: &str) -> Option<&str> {
        self.parent_of.get(sku).map(String::as_str)
    }

    pub fn child(&self, sku: &str) -> Option<&ChildSku> {
        let parent = self.parent_of(sku)?;
        self.children(parent).iter().find(|c| c.sku == sku)
    }

    pub fn child_skus(&self) -> Vec<String> {
        self.children
            .values()
            .flatten()
            .map(|c| c.sku.clone())
            .collect()
    }
}

/// Point-in-time on-hand quantities keyed by (warehouse, SKU)
#[derive(Debug, Clone)]
pub struct StockSnapshot {
    taken_at: DateTime<Utc>,
    on_hand: HashMap<(Uuid, String), i32>,
}

impl StockSnapshot {
    pub fn new(locations: impl IntoIterator<Item = InventoryLocation>, taken_at: DateTime<Utc>) -> Self {
        let mut on_hand = HashMap::new();
        for location in locations {
            *on_hand
                .entry((location.warehouse_id, location.sku))
                .or_insert(0) += location.quantity;
        }
        Self { taken_at, on_hand }
    }

    pub fn empty(taken_at: DateTime<Utc>) -> Self {
        Self::new(Vec::new(), taken_at)
    }

    /// Missing records count as zero
    pub fn on_hand(&self, warehouse_id: Uuid, sku: &str) -> i32 {
        self.on_hand
            .get(&(warehouse_id, sku.to_string()))
            .copied()
            .unwrap_or(0)
    }

    /// Child SKU -> on-hand for one warehouse
    pub fn for_warehouse(&self, warehouse_id: Uuid) -> HashMap<String, i32> {
        self.on_hand
            .iter()
            .filter(|((warehouse, _), _)| *warehouse == warehouse_id)
            .map(|((_, sku), qty)| (sku.clone(), *qty))
            .collect()
    }

    pub fn taken_at(&self) -> DateTime<Utc> {
        self.taken_at
    }

    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.taken_at
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
