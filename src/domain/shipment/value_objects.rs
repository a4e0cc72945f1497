use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Shipment Value Objects
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShipmentStatus {
    Pending,
    Preparing,
    Shipped,
    Delivered,
    Cancelled,
}

impl ShipmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShipmentStatus::Pending => "pending",
            ShipmentStatus::Preparing => "preparing",
            ShipmentStatus::Shipped => "shipped",
            ShipmentStatus::Delivered => "delivered",
            ShipmentStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(ShipmentStatus::Pending),
            "preparing" => Some(ShipmentStatus::Preparing),
            "shipped" => Some(ShipmentStatus::Shipped),
            "delivered" => Some(ShipmentStatus::Delivered),
            "cancelled" => Some(ShipmentStatus::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ShipmentStatus::Delivered | ShipmentStatus::Cancelled)
    }

    /// Stock has left the warehouse for this shipment
    pub fn has_deducted_stock(&self) -> bool {
        matches!(self, ShipmentStatus::Shipped | ShipmentStatus::Delivered)
    }
}

impl fmt::Display for ShipmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Product family a B2B order line points at
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentProduct {
    pub parent_sku: String,
    pub product_name: String,
    pub category: Option<String>,
}

/// A concrete sellable variant of a parent SKU
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildSku {
    pub product_id: Uuid,
    pub sku: String,
    pub parent_sku: String,
    pub product_name: String,
    pub color: Option<String>,
    pub size: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warehouse {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub is_active: bool,
}

/// On-hand stock of one SKU in one warehouse
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryLocation {
    pub warehouse_id: Uuid,
    pub sku: String,
    pub quantity: i32,
}

/// Signed stock movement produced by a shipment status change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryAdjustment {
    pub warehouse_id: Uuid,
    pub sku: String,
    pub delta: i32,
    pub reason: String,
}

/// Advisory stock figures for one child SKU at the time it was added
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockIndicator {
    pub on_hand: i32,
    pub requested: i32,
    pub already_added: i32,
    pub low_stock: bool,
}

impl StockIndicator {
    pub fn is_short(&self) -> bool {
        self.on_hand < self.requested + self.already_added
    }

    /// How many units the draft asks for beyond what is on hand
    pub fn shortfall(&self) -> i32 {
        (self.requested + self.already_added - self.on_hand).max(0)
    }

    pub fn out_of_stock(&self) -> bool {
        self.on_hand <= 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipmentLine {
    pub id: Uuid,
    /// Originating order line; ad hoc lines have none
    pub order_line_id: Option<Uuid>,
    pub sku: String,
    pub quantity: i32,
    pub box_number: Option<i32>,
    pub product_name: String,
    pub color: Option<String>,
    pub size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock: Option<StockIndicator>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipmentHeader {
    pub id: Uuid,
    pub order_id: Uuid,
    pub shipment_number: String,
    pub warehouse_id: Uuid,
    pub status: ShipmentStatus,
    pub planned_date: Option<NaiveDate>,
    pub shipped_date: Option<NaiveDate>,
    pub shipping_method: Option<String>,
    pub carrier_name: Option<String>,
    pub tracking_number: Option<String>,
    pub shipping_cost: Decimal,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A committed shipment with its lines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shipment {
    pub header: ShipmentHeader,
    pub lines: Vec<ShipmentLine>,
}

impl Shipment {
    pub fn total_quantity(&self) -> i64 {
        self.lines.iter().map(|l| i64::from(l.quantity)).sum()
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip_through_strings() {
        for status in [
            ShipmentStatus::Pending,
            ShipmentStatus::Preparing,
            ShipmentStatus::Shipped,
            ShipmentStatus::Delivered,
            ShipmentStatus::Cancelled,
        ] {
            assert_eq!(ShipmentStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(ShipmentStatus::parse("lost"), None);
    }

    #[test]
    fn test_stock_indicator_shortfall() {
        let indicator = StockIndicator {
            on_hand: 5,
            requested: 10,
            already_added: 0,
            low_stock: true,
        };
        assert!(indicator.is_short());
        assert_eq!(indicator.shortfall(), 5);
        assert!(!indicator.out_of_stock());
    }

    #[test]
    fn test_stock_indicator_counts_draft_quantity() {
        let indicator = StockIndicator {
            on_hand: 10,
            requested: 4,
            already_added: 6,
            low_stock: false,
        };
        assert!(!indicator.is_short());
        assert_eq!(indicator.shortfall(), 0);
    }
}
