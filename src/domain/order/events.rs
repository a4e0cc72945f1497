use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::pricing::{AdjustmentField, LineEdit};
use super::value_objects::{OrderLine, OrderStatus, PaymentStatus};
use crate::domain::customer_price::PriceBook;
use crate::reducer::DomainEvent;

// ============================================================================
// Order Events - Accepted changes to a draft order
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OrderEvent {
    LineAdded(OrderLine),
    LineQuantityIncreased {
        parent_sku: String,
        by: i32,
    },
    LineEdited {
        parent_sku: String,
        edit: LineEdit,
    },
    LineRemoved {
        parent_sku: String,
    },
    AdjustmentSet {
        field: AdjustmentField,
        value: Decimal,
    },
    CustomerAttached {
        customer_id: Uuid,
        currency: Option<String>,
        payment_terms: Option<String>,
    },
    /// Bulk overwrite of every line whose SKU has a negotiated price
    PricesResolved(PriceBook),
    StatusChanged {
        from: OrderStatus,
        to: OrderStatus,
        at: DateTime<Utc>,
    },
    PaymentStatusChanged(PaymentStatus),
    NotesUpdated {
        shipping_address: Option<String>,
        internal_notes: Option<String>,
        customer_notes: Option<String>,
    },
}

impl DomainEvent for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::LineAdded(_) => "OrderLineAdded",
            OrderEvent::LineQuantityIncreased { .. } => "OrderLineQuantityIncreased",
            OrderEvent::LineEdited { .. } => "OrderLineEdited",
            OrderEvent::LineRemoved { .. } => "OrderLineRemoved",
            OrderEvent::AdjustmentSet { .. } => "OrderAdjustmentSet",
            OrderEvent::CustomerAttached { .. } => "OrderCustomerAttached",
            OrderEvent::PricesResolved(_) => "OrderPricesResolved",
            OrderEvent::StatusChanged { .. } => "OrderStatusChanged",
            OrderEvent::PaymentStatusChanged(_) => "OrderPaymentStatusChanged",
            OrderEvent::NotesUpdated { .. } => "OrderNotesUpdated",
        }
    }
}
