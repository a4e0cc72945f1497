use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::catalog::StockSnapshot;
use super::commands::ShipmentCommand;
use super::errors::ShipmentError;
use super::events::ShipmentEvent;
use super::value_objects::{Shipment, ShipmentHeader, ShipmentLine, ShipmentStatus, StockIndicator};
use crate::reducer::Aggregate;

// ============================================================================
// Shipment Draft - In-progress shipment built against a stock snapshot
// ============================================================================
//
// Lines are unique per child SKU: adding a SKU that is already on the draft
// sums the quantities. Stock indicators are advisory and computed when a
// line is added; switching warehouse later does not recompute them.
//
// ============================================================================

/// Header fields typed by the operator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShipmentDetails {
    pub planned_date: Option<NaiveDate>,
    pub shipping_method: Option<String>,
    pub carrier_name: Option<String>,
    pub tracking_number: Option<String>,
    pub shipping_cost: Decimal,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ShipmentDraft {
    pub order_id: Uuid,
    pub warehouse_id: Option<Uuid>,
    pub lines: Vec<ShipmentLine>,
    pub details: ShipmentDetails,
    snapshot: StockSnapshot,
    low_stock_threshold: i32,
}

impl ShipmentDraft {
    pub fn new(order_id: Uuid, snapshot: StockSnapshot, low_stock_threshold: i32) -> Self {
        Self {
            order_id,
            warehouse_id: None,
            lines: Vec::new(),
            details: ShipmentDetails::default(),
            snapshot,
            low_stock_threshold,
        }
    }

    pub fn line(&self, sku: &str) -> Option<&ShipmentLine> {
        self.lines.iter().find(|l| l.sku == sku)
    }

    fn line_mut(&mut self, sku: &str) -> Option<&mut ShipmentLine> {
        self.lines.iter_mut().find(|l| l.sku == sku)
    }

    fn require_line(&self, sku: &str) -> Result<(), ShipmentError> {
        self.line(sku)
            .map(|_| ())
            .ok_or_else(|| ShipmentError::LineNotFound(sku.to_string()))
    }

    pub fn snapshot(&self) -> &StockSnapshot {
        &self.snapshot
    }

    pub fn snapshot_age(&self, now: DateTime<Utc>) -> Duration {
        self.snapshot.age(now)
    }

    pub fn total_quantity(&self) -> i64 {
        self.lines.iter().map(|l| i64::from(l.quantity)).sum()
    }

    /// Stock check for adding `requested` of `sku` at the selected warehouse
    pub fn indicator(&self, sku: &str, requested: i32) -> Option<StockIndicator> {
        let warehouse_id = self.warehouse_id?;
        let on_hand = self.snapshot.on_hand(warehouse_id, sku);
        Some(StockIndicator {
            on_hand,
            requested,
            already_added: self.line(sku).map(|l| l.quantity).unwrap_or(0),
            low_stock: on_hand < self.low_stock_threshold,
        })
    }

    /// Checks run before any write; returns the selected warehouse
    pub fn validate(&self) -> Result<Uuid, ShipmentError> {
        let warehouse_id = self.warehouse_id.ok_or(ShipmentError::WarehouseRequired)?;
        if self.lines.is_empty() {
            return Err(ShipmentError::NoLines);
        }
        Ok(warehouse_id)
    }

    /// The record to persist, in `pending` status
    pub fn to_shipment(&self, shipment_number: String, now: DateTime<Utc>) -> Result<Shipment, ShipmentError> {
        let warehouse_id = self.validate()?;
        let header = ShipmentHeader {
            id: Uuid::now_v7(),
            order_id: self.order_id,
            shipment_number,
            warehouse_id,
            status: ShipmentStatus::Pending,
            planned_date: self.details.planned_date,
            shipped_date: None,
            shipping_method: self.details.shipping_method.clone(),
            carrier_name: self.details.carrier_name.clone(),
            tracking_number: self.details.tracking_number.clone(),
            shipping_cost: self.details.shipping_cost,
            notes: self.details.notes.clone(),
            created_at: now,
        };
        Ok(Shipment {
            header,
            lines: self.lines.clone(),
        })
    }
}

// ============================================================================
// Aggregate Trait Implementation
// ============================================================================

impl Aggregate for ShipmentDraft {
    type Event = ShipmentEvent;
    type Command = ShipmentCommand;
    type Error = ShipmentError;

    fn handle_command(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            ShipmentCommand::SelectWarehouse(warehouse_id) => {
                if self.warehouse_id == Some(*warehouse_id) {
                    return Ok(vec![]);
                }
                Ok(vec![ShipmentEvent::WarehouseSelected(*warehouse_id)])
            }

            ShipmentCommand::AddSku { child, order_line_id, quantity } => {
                // The add button does nothing without a positive quantity
                if *quantity <= 0 {
                    return Ok(vec![]);
                }

                let stock = self.indicator(&child.sku, *quantity);
                if self.line(&child.sku).is_some() {
                    return Ok(vec![ShipmentEvent::LineMerged {
                        sku: child.sku.clone(),
                        added: *quantity,
                        stock,
                    }]);
                }

                Ok(vec![ShipmentEvent::LineAdded(ShipmentLine {
                    id: Uuid::now_v7(),
                    order_line_id: *order_line_id,
                    sku: child.sku.clone(),
                    quantity: *quantity,
                    box_number: None,
                    product_name: child.product_name.clone(),
                    color: child.color.clone(),
                    size: child.size.clone(),
                    stock,
                })])
            }

            ShipmentCommand::SetLineQuantity { sku, quantity } => {
                self.require_line(sku)?;
                if *quantity <= 0 {
                    return Err(ShipmentError::InvalidQuantity(*quantity));
                }
                Ok(vec![ShipmentEvent::LineQuantitySet {
                    sku: sku.clone(),
                    quantity: *quantity,
                }])
            }

            ShipmentCommand::SetBoxNumber { sku, box_number } => {
                self.require_line(sku)?;
                Ok(vec![ShipmentEvent::BoxNumberSet {
                    sku: sku.clone(),
                    box_number: *box_number,
                }])
            }

            ShipmentCommand::RemoveLine { sku } => {
                self.require_line(sku)?;
                Ok(vec![ShipmentEvent::LineRemoved { sku: sku.clone() }])
            }

            ShipmentCommand::UpdateDetails(details) => {
                Ok(vec![ShipmentEvent::DetailsUpdated(details.clone())])
            }
        }
    }

    fn apply_event(&mut self, event: &Self::Event) {
        match event {
            ShipmentEvent::WarehouseSelected(warehouse_id) => {
                self.warehouse_id = Some(*warehouse_id);
            }
            ShipmentEvent::LineAdded(line) => {
                self.lines.push(line.clone());
            }
            ShipmentEvent::LineMerged { sku, added, stock } => {
                if let Some(line) = self.line_mut(sku) {
                    line.quantity = line.quantity.saturating_add(*added);
                    if stock.is_some() {
                        line.stock = *stock;
                    }
                }
            }
            ShipmentEvent::LineQuantitySet { sku, quantity } => {
                if let Some(line) = self.line_mut(sku) {
                    line.quantity = *quantity;
                }
            }
            ShipmentEvent::BoxNumberSet { sku, box_number } => {
                if let Some(line) = self.line_mut(sku) {
                    line.box_number = *box_number;
                }
            }
            ShipmentEvent::LineRemoved { sku } => {
                self.lines.retain(|l| &l.sku != sku);
            }
            ShipmentEvent::DetailsUpdated(details) => {
                self.details = details.clone();
                self.details.shipping_cost = self.details.shipping_cost.max(Decimal::ZERO);
            }
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
