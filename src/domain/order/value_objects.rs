use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::pricing::line_total;

// ============================================================================
// Order Value Objects
// ============================================================================

/// One quantity/price commitment against a parent SKU.
///
/// `line_total` is derived; it is only ever written by `recompute`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct OrderLine {
    pub id: Uuid,
    pub parent_sku: String,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub discount_rate: Decimal,
    pub line_total: Decimal,
    pub notes: Option<String>,
}

impl OrderLine {
    pub fn new(
        parent_sku: impl Into<String>,
        product_name: impl Into<String>,
        quantity: i32,
        unit_price: Decimal,
    ) -> Self {
        let mut line = Self {
            id: Uuid::new_v4(),
            parent_sku: parent_sku.into(),
            product_name: product_name.into(),
            quantity: quantity.max(1),
            unit_price: unit_price.max(Decimal::ZERO),
            discount_rate: Decimal::ZERO,
            line_total: Decimal::ZERO,
            notes: None,
        };
        line.recompute();
        line
    }

    pub(crate) fn recompute(&mut self) {
        self.line_total = line_total(self.quantity, self.unit_price, self.discount_rate);
    }
}

/// Operator-entered order-level adjustments
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Adjustments {
    pub discount_amount: Decimal,
    pub shipping_cost: Decimal,
    pub tax_amount: Decimal,
}

/// Derived monetary fields of an order
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub discount_amount: Decimal,
    pub shipping_cost: Decimal,
    pub tax_amount: Decimal,
    pub total: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    QuoteDraft,
    QuoteSent,
    Confirmed,
    InvoiceCreated,
    Shipping,
    Shipped,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 8] = [
        OrderStatus::QuoteDraft,
        OrderStatus::QuoteSent,
        OrderStatus::Confirmed,
        OrderStatus::InvoiceCreated,
        OrderStatus::Shipping,
        OrderStatus::Shipped,
        OrderStatus::Completed,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::QuoteDraft => "quote_draft",
            OrderStatus::QuoteSent => "quote_sent",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::InvoiceCreated => "invoice_created",
            OrderStatus::Shipping => "shipping",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == value)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Partial,
    Paid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Partial => "partial",
            PaymentStatus::Paid => "paid",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(PaymentStatus::Pending),
            "partial" => Some(PaymentStatus::Partial),
            "paid" => Some(PaymentStatus::Paid),
            _ => None,
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
