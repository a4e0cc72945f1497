use uuid::Uuid;

use super::draft::ShipmentDetails;
use super::value_objects::ChildSku;

// ============================================================================
// Shipment Draft Commands
// ============================================================================

#[derive(Debug, Clone)]
pub enum ShipmentCommand {
    SelectWarehouse(Uuid),
    /// Add `quantity` of one child SKU; repeated adds of a SKU merge
    AddSku {
        child: ChildSku,
        order_line_id: Option<Uuid>,
        quantity: i32,
    },
    SetLineQuantity {
        sku: String,
        quantity: i32,
    },
    SetBoxNumber {
        sku: String,
        box_number: Option<i32>,
    },
    RemoveLine {
        sku: String,
    },
    UpdateDetails(ShipmentDetails),
}
