use serde::{Deserialize, Serialize};

use super::errors::OrderError;
use super::value_objects::OrderStatus;

// ============================================================================
// Order Status State Machine
// ============================================================================
//
// quote_draft -> quote_sent -> confirmed -> invoice_created -> shipping
//             -> shipped -> completed, plus cancelled from any non-terminal
//
// Operators move orders by explicit selection. The shipment workflow drives
// two automatic transitions. Nothing moves an order out of `cancelled`.
//
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusEvent {
    /// Operator picked a status from the list
    Selected(OrderStatus),
    /// The order's first shipment was committed
    FirstShipmentCreated,
    /// One of the order's shipments was marked shipped
    ShipmentDispatched,
}

impl OrderStatus {
    /// Guarded transition function
    pub fn transition(self, event: StatusEvent) -> Result<OrderStatus, OrderError> {
        if self == OrderStatus::Cancelled {
            return match event {
                StatusEvent::Selected(OrderStatus::Cancelled) => Ok(OrderStatus::Cancelled),
                _ => Err(OrderError::AlreadyCancelled),
            };
        }

        match event {
            StatusEvent::Selected(target) if target == self => Ok(self),
            StatusEvent::Selected(target) if self.is_terminal() => {
                Err(OrderError::InvalidStatusTransition { from: self, to: target })
            }
            StatusEvent::Selected(target) => Ok(target),
            StatusEvent::FirstShipmentCreated => Ok(OrderStatus::Shipping),
            StatusEvent::ShipmentDispatched => Ok(OrderStatus::Shipped),
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
