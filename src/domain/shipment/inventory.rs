use super::errors::ShipmentError;
use super::value_objects::{InventoryAdjustment, Shipment, ShipmentStatus};

// ============================================================================
// Shipment Status Lifecycle & Inventory Effects
// ============================================================================
//
// pending/preparing -> shipped deducts stock, shipped -> cancelled puts it
// back. Once shipped, a shipment cannot return to pending/preparing.
//
// ============================================================================

impl ShipmentStatus {
    pub fn check_transition(self, to: ShipmentStatus) -> Result<(), ShipmentError> {
        let allowed = match (self, to) {
            (from, to) if from == to => true,
            (from, _) if from.is_terminal() => false,
            (ShipmentStatus::Shipped, ShipmentStatus::Pending | ShipmentStatus::Preparing) => false,
            (ShipmentStatus::Pending | ShipmentStatus::Preparing, ShipmentStatus::Delivered) => false,
            _ => true,
        };
        if allowed {
            Ok(())
        } else {
            Err(ShipmentError::InvalidTransition { from: self, to })
        }
    }
}

/// Stock movements implied by moving `shipment` to status `to`
pub fn inventory_effects(shipment: &Shipment, to: ShipmentStatus) -> Vec<InventoryAdjustment> {
    let from = shipment.header.status;
    let sign = match (from.has_deducted_stock(), to) {
        (false, ShipmentStatus::Shipped) => -1,
        (true, ShipmentStatus::Cancelled) => 1,
        _ => return Vec::new(),
    };
    let reason = if sign < 0 {
        format!("shipment {} shipped", shipment.header.shipment_number)
    } else {
        format!("shipment {} cancelled", shipment.header.shipment_number)
    };

    shipment
        .lines
        .iter()
        .filter(|line| line.quantity > 0)
        .map(|line| InventoryAdjustment {
            warehouse_id: shipment.header.warehouse_id,
            sku: line.sku.clone(),
            delta: sign * line.quantity,
            reason: reason.clone(),
        })
        .collect()
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::shipment::{ShipmentHeader, ShipmentLine};
    use chrono::Utc;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    fn shipment(status: ShipmentStatus) -> Shipment {
        let line = |sku: &str, quantity| ShipmentLine {
            id: Uuid::new_v4(),
            order_line_id: None,
            sku: sku.to_string(),
            quantity,
            box_number: None,
            product_name: sku.to_string(),
            color: None,
            size: None,
            stock: None,
        };
        Shipment {
            header: ShipmentHeader {
                id: Uuid::new_v4(),
                order_id: Uuid::new_v4(),
                shipment_number: "SHP-20260101-0003".to_string(),
                warehouse_id: Uuid::new_v4(),
                status,
                planned_date: None,
                shipped_date: None,
                shipping_method: None,
                carrier_name: None,
                tracking_number: None,
                shipping_cost: Decimal::ZERO,
                notes: None,
                created_at: Utc::now(),
            },
            lines: vec![line("A", 3), line("B", 2)],
        }
    }

    #[test]
    fn test_shipping_deducts_every_line() {
        let s = shipment(ShipmentStatus::Preparing);
        let effects = inventory_effects(&s, ShipmentStatus::Shipped);
        let deltas: Vec<(&str, i32)> = effects.iter().map(|e| (e.sku.as_str(), e.delta)).collect();
        assert_eq!(deltas, vec![("A", -3), ("B", -2)]);
        assert!(effects.iter().all(|e| e.warehouse_id == s.header.warehouse_id));
    }

    #[test]
    fn test_cancelling_shipped_restores_stock() {
        let s = shipment(ShipmentStatus::Shipped);
        let effects = inventory_effects(&s, ShipmentStatus::Cancelled);
        assert_eq!(effects.iter().map(|e| e.delta).sum::<i32>(), 5);
    }

    #[test]
    fn test_cancelling_unshipped_touches_nothing() {
        let s = shipment(ShipmentStatus::Pending);
        assert!(inventory_effects(&s, ShipmentStatus::Cancelled).is_empty());
        assert!(inventory_effects(&s, ShipmentStatus::Preparing).is_empty());
    }

    #[test]
    fn test_delivering_shipped_touches_nothing() {
        let s = shipment(ShipmentStatus::Shipped);
        assert!(inventory_effects(&s, ShipmentStatus::Delivered).is_empty());
    }

    #[test]
    fn test_transition_guards() {
        use ShipmentStatus::*;
        assert!(Pending.check_transition(Preparing).is_ok());
        assert!(Preparing.check_transition(Shipped).is_ok());
        assert!(Shipped.check_transition(Delivered).is_ok());
        assert!(Shipped.check_transition(Cancelled).is_ok());
        assert!(Shipped.check_transition(Pending).is_err());
        assert!(Pending.check_transition(Delivered).is_err());
        assert!(Delivered.check_transition(Cancelled).is_err());
        assert!(Cancelled.check_transition(Shipped).is_err());
        assert!(Cancelled.check_transition(Cancelled).is_ok());
    }
}
