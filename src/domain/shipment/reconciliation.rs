use serde::Serialize;
use uuid::Uuid;

use super::catalog::SkuCatalog;
use super::value_objects::{Shipment, ShipmentLine, ShipmentStatus};
use crate::domain::order::OrderLine;

// ============================================================================
// Fulfillment Reconciliation - ordered vs shipped per order line
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FulfillmentState {
    UnderShipped,
    Fulfilled,
    /// Allowed, but worth a warning
    OverShipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineFulfillment {
    pub order_line_id: Uuid,
    pub parent_sku: String,
    pub product_name: String,
    pub ordered: i64,
    pub shipped: i64,
    /// Negative when over-shipped
    pub remaining: i64,
    pub state: FulfillmentState,
    /// The parent SKU has no child SKU to ship
    pub no_skus: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconciliationReport {
    pub lines: Vec<LineFulfillment>,
}

impl ReconciliationReport {
    pub fn line(&self, parent_sku: &str) -> Option<&LineFulfillment> {
        self.lines.iter().find(|l| l.parent_sku == parent_sku)
    }

    pub fn over_shipped(&self) -> impl Iterator<Item = &LineFulfillment> {
        self.lines
            .iter()
            .filter(|l| l.state == FulfillmentState::OverShipped)
    }

    pub fn is_fully_shipped(&self) -> bool {
        self.lines
            .iter()
            .all(|l| l.state != FulfillmentState::UnderShipped)
    }
}

/// Lines of shipments that still count towards fulfillment
pub fn active_lines(shipments: &[Shipment]) -> impl Iterator<Item = &ShipmentLine> {
    shipments
        .iter()
        .filter(|s| s.header.status != ShipmentStatus::Cancelled)
        .flat_map(|s| s.lines.iter())
}

/// Attribute each shipment line to an order line and total it up.
///
/// A line is attributed through its child SKU's parent first, then through
/// its recorded order line. Lines matching neither are ignored.
pub fn reconcile<'a>(
    order_lines: &[OrderLine],
    catalog: &SkuCatalog,
    shipment_lines: impl IntoIterator<Item = &'a ShipmentLine>,
) -> ReconciliationReport {
    let mut shipped = vec![0i64; order_lines.len()];

    for line in shipment_lines {
        let by_parent = catalog
            .parent_of(&line.sku)
            .and_then(|parent| order_lines.iter().position(|o| o.parent_sku == parent));
        let by_line_id = || {
            line.order_line_id
                .and_then(|id| order_lines.iter().position(|o| o.id == id))
        };

        if let Some(idx) = by_parent.or_else(by_line_id) {
            shipped[idx] += i64::from(line.quantity);
        }
    }

    let lines = order_lines
        .iter()
        .zip(shipped)
        .map(|(order_line, shipped)| {
            let ordered = i64::from(order_line.quantity);
            let state = match shipped.cmp(&ordered) {
                std::cmp::Ordering::Less => FulfillmentState::UnderShipped,
                std::cmp::Ordering::Equal => FulfillmentState::Fulfilled,
                std::cmp::Ordering::Greater => FulfillmentState::OverShipped,
            };
            LineFulfillment {
                order_line_id: order_line.id,
                parent_sku: order_line.parent_sku.clone(),
                product_name: order_line.product_name.clone(),
                ordered,
                shipped,
                remaining: ordered - shipped,
                state,
                no_skus: !catalog.has_skus(&order_line.parent_sku),
            }
        })
        .collect();

    ReconciliationReport { lines }
}

// ============================================================================
// Unit Tests
// ============================================================================
