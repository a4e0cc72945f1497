use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::draft::ShipmentDetails;
use super::value_objects::{ShipmentLine, StockIndicator};
use crate::reducer::DomainEvent;

// ============================================================================
// Shipment Draft Events
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ShipmentEvent {
    WarehouseSelected(Uuid),
    LineAdded(ShipmentLine),
    LineMerged {
        sku: String,
        added: i32,
        stock: Option<StockIndicator>,
    },
    LineQuantitySet {
        sku: String,
        quantity: i32,
    },
    BoxNumberSet {
        sku: String,
        box_number: Option<i32>,
    },
    LineRemoved {
        sku: String,
    },
    DetailsUpdated(ShipmentDetails),
}

impl ShipmentEvent {
    /// Stock figures computed for an add, if any
    pub fn stock(&self) -> Option<(&str, StockIndicator)> {
        match self {
            ShipmentEvent::LineAdded(line) => line.stock.map(|s| (line.sku.as_str(), s)),
            ShipmentEvent::LineMerged { sku, stock, .. } => stock.map(|s| (sku.as_str(), s)),
            _ => None,
        }
    }
}

impl DomainEvent for ShipmentEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ShipmentEvent::WarehouseSelected(_) => "ShipmentWarehouseSelected",
            ShipmentEvent::LineAdded(_) => "ShipmentLineAdded",
            ShipmentEvent::LineMerged { .. } => "ShipmentLineMerged",
            ShipmentEvent::LineQuantitySet { .. } => "ShipmentLineQuantitySet",
            ShipmentEvent::BoxNumberSet { .. } => "ShipmentBoxNumberSet",
            ShipmentEvent::LineRemoved { .. } => "ShipmentLineRemoved",
            ShipmentEvent::DetailsUpdated(_) => "ShipmentDetailsUpdated",
        }
    }
}
