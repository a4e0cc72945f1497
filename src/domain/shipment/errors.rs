use uuid::Uuid;

use super::value_objects::ShipmentStatus;

// ============================================================================
// Shipment Business Rule Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ShipmentError {
    #[error("Select a warehouse before saving the shipment")]
    WarehouseRequired,

    #[error("Unknown or inactive warehouse: {0}")]
    UnknownWarehouse(Uuid),

    #[error("Add at least one SKU before saving the shipment")]
    NoLines,

    #[error("Cannot ship a cancelled order")]
    OrderCancelled,

    #[error("SKU {0} does not belong to any line of this order")]
    UnknownSku(String),

    #[error("Shipment has no line for SKU {0}")]
    LineNotFound(String),

    #[error("Invalid shipment quantity: {0}")]
    InvalidQuantity(i32),

    #[error("Cannot move shipment from {from} to {to}")]
    InvalidTransition {
        from: ShipmentStatus,
        to: ShipmentStatus,
    },

    #[error("Shipment not found: {0}")]
    NotFound(Uuid),
}

impl ShipmentError {
    pub fn reason(&self) -> &'static str {
        match self {
            ShipmentError::WarehouseRequired => "warehouse_required",
            ShipmentError::UnknownWarehouse(_) => "unknown_warehouse",
            ShipmentError::NoLines => "no_lines",
            ShipmentError::OrderCancelled => "order_cancelled",
            ShipmentError::UnknownSku(_) => "unknown_sku",
            ShipmentError::LineNotFound(_) => "line_not_found",
            ShipmentError::InvalidQuantity(_) => "invalid_quantity",
            ShipmentError::InvalidTransition { .. } => "invalid_transition",
            ShipmentError::NotFound(_) => "not_found",
        }
    }
}
