use uuid::Uuid;

use super::pricing::{AdjustmentField, LineField};
use super::status::StatusEvent;
use super::value_objects::PaymentStatus;
use crate::domain::customer_price::{B2bCustomer, PriceBook};

// ============================================================================
// Order Commands - Represent operator intent on a draft order
// ============================================================================

#[derive(Debug, Clone)]
pub enum OrderCommand {
    /// Add a parent SKU; an existing line for the same SKU grows instead
    AddLine {
        parent_sku: String,
        product_name: String,
        quantity: i32,
    },
    /// Raw form input for quantity, unit price or discount rate
    SetLineField {
        parent_sku: String,
        field: LineField,
        raw: String,
    },
    RemoveLine {
        parent_sku: String,
    },
    /// Raw form input for discount amount, shipping cost or tax
    SetAdjustment {
        field: AdjustmentField,
        raw: String,
    },
    /// Attach (or switch) the customer and re-price every line
    AttachCustomer {
        customer_id: Uuid,
        customer: Option<B2bCustomer>,
        prices: PriceBook,
    },
    ChangeStatus(StatusEvent),
    ChangePaymentStatus(PaymentStatus),
    UpdateNotes {
        shipping_address: Option<String>,
        internal_notes: Option<String>,
        customer_notes: Option<String>,
    },
}
