use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::commands::OrderCommand;
use super::errors::OrderError;
use super::events::OrderEvent;
use super::pricing::{coerce_amount, recompute_order_totals};
use super::value_objects::{Adjustments, OrderLine, OrderStatus, OrderTotals, PaymentStatus};
use crate::domain::customer_price::PriceBook;
use crate::reducer::Aggregate;

// ============================================================================
// Order Aggregate - Draft order value object
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderAggregate {
    // Identity
    pub id: Uuid,
    pub order_number: String,

    // Header
    pub customer_id: Option<Uuid>,
    pub currency: String,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_terms: Option<String>,
    pub order_date: NaiveDate,
    pub quote_valid_until: Option<NaiveDate>,
    pub shipping_address: Option<String>,
    pub internal_notes: Option<String>,
    pub customer_notes: Option<String>,

    // Lines and money; `totals` is always derived from the other two
    pub lines: Vec<OrderLine>,
    pub adjustments: Adjustments,
    pub totals: OrderTotals,

    // Negotiated prices of the attached customer, used for new lines
    #[serde(default)]
    pub price_book: PriceBook,

    // Audit
    pub confirmed_at: Option<DateTime<Utc>>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderAggregate {
    /// A fresh quote in `quote_draft`
    pub fn draft(order_number: impl Into<String>, order_date: NaiveDate) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            order_number: order_number.into(),
            customer_id: None,
            currency: "KRW".to_string(),
            status: OrderStatus::QuoteDraft,
            payment_status: PaymentStatus::Pending,
            payment_terms: None,
            order_date,
            quote_valid_until: None,
            shipping_address: None,
            internal_notes: None,
            customer_notes: None,
            lines: Vec::new(),
            adjustments: Adjustments::default(),
            totals: OrderTotals::default(),
            price_book: PriceBook::default(),
            confirmed_at: None,
            shipped_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn line(&self, parent_sku: &str) -> Option<&OrderLine> {
        self.lines.iter().find(|l| l.parent_sku == parent_sku)
    }

    fn line_mut(&mut self, parent_sku: &str) -> Option<&mut OrderLine> {
        self.lines.iter_mut().find(|l| l.parent_sku == parent_sku)
    }

    pub fn parent_skus(&self) -> Vec<String> {
        self.lines.iter().map(|l| l.parent_sku.clone()).collect()
    }

    /// Checks that must pass before the order is written
    pub fn validate_for_save(&self) -> Result<(), OrderError> {
        if self.customer_id.is_none() {
            return Err(OrderError::CustomerRequired);
        }
        Ok(())
    }

    fn require_line(&self, parent_sku: &str) -> Result<(), OrderError> {
        self.line(parent_sku)
            .map(|_| ())
            .ok_or_else(|| OrderError::LineNotFound(parent_sku.to_string()))
    }

    fn recompute_totals(&mut self) {
        self.totals = recompute_order_totals(&self.lines, &self.adjustments);
    }
}

// ============================================================================
// Aggregate Trait Implementation
// ============================================================================

impl Aggregate for OrderAggregate {
    type Event = OrderEvent;
    type Command = OrderCommand;
    type Error = OrderError;

    fn handle_command(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            OrderCommand::AddLine { parent_sku, product_name, quantity } => {
                if parent_sku.trim().is_empty() {
                    return Err(OrderError::EmptyParentSku);
                }
                if *quantity <= 0 {
                    return Err(OrderError::InvalidQuantity(*quantity));
                }

                if self.line(parent_sku).is_some() {
                    return Ok(vec![OrderEvent::LineQuantityIncreased {
                        parent_sku: parent_sku.clone(),
                        by: *quantity,
                    }]);
                }

                let unit_price = self.price_book.get(parent_sku).unwrap_or(Decimal::ZERO);
                Ok(vec![OrderEvent::LineAdded(OrderLine::new(
                    parent_sku.clone(),
                    product_name.clone(),
                    *quantity,
                    unit_price,
                ))])
            }

            OrderCommand::SetLineField { parent_sku, field, raw } => {
                self.require_line(parent_sku)?;
                Ok(vec![OrderEvent::LineEdited {
                    parent_sku: parent_sku.clone(),
                    edit: field.coerce(raw),
                }])
            }

            OrderCommand::RemoveLine { parent_sku } => {
                self.require_line(parent_sku)?;
                Ok(vec![OrderEvent::LineRemoved {
                    parent_sku: parent_sku.clone(),
                }])
            }

            OrderCommand::SetAdjustment { field, raw } => Ok(vec![OrderEvent::AdjustmentSet {
                field: *field,
                value: coerce_amount(raw),
            }]),

            OrderCommand::AttachCustomer { customer_id, customer, prices } => Ok(vec![
                OrderEvent::CustomerAttached {
                    customer_id: *customer_id,
                    currency: customer.as_ref().map(|c| c.currency.clone()),
                    payment_terms: customer.as_ref().and_then(|c| c.payment_terms.clone()),
                },
                OrderEvent::PricesResolved(prices.clone()),
            ]),

            OrderCommand::ChangeStatus(event) => {
                let next = self.status.transition(*event)?;
                if next == self.status {
                    return Ok(vec![]);
                }
                Ok(vec![OrderEvent::StatusChanged {
                    from: self.status,
                    to: next,
                    at: Utc::now(),
                }])
            }

            OrderCommand::ChangePaymentStatus(status) => {
                if *status == self.payment_status {
                    return Ok(vec![]);
                }
                Ok(vec![OrderEvent::PaymentStatusChanged(*status)])
            }

            OrderCommand::UpdateNotes { shipping_address, internal_notes, customer_notes } => {
                Ok(vec![OrderEvent::NotesUpdated {
                    shipping_address: shipping_address.clone(),
                    internal_notes: internal_notes.clone(),
                    customer_notes: customer_notes.clone(),
                }])
            }
        }
    }

    fn apply_event(&mut self, event: &Self::Event) {
        self.updated_at = Utc::now();

        match event {
            OrderEvent::LineAdded(line) => {
                self.lines.push(line.clone());
            }
            OrderEvent::LineQuantityIncreased { parent_sku, by } => {
                if let Some(line) = self.line_mut(parent_sku) {
                    line.quantity = line.quantity.saturating_add(*by);
                    line.recompute();
                }
            }
            OrderEvent::LineEdited { parent_sku, edit } => {
                if let Some(line) = self.line_mut(parent_sku) {
                    edit.apply(line);
                }
            }
            OrderEvent::LineRemoved { parent_sku } => {
                self.lines.retain(|l| &l.parent_sku != parent_sku);
            }
            OrderEvent::AdjustmentSet { field, value } => {
                field.apply(&mut self.adjustments, *value);
            }
            OrderEvent::CustomerAttached { customer_id, currency, payment_terms } => {
                self.customer_id = Some(*customer_id);
                if let Some(currency) = currency {
                    self.currency = currency.clone();
                }
                if payment_terms.is_some() {
                    self.payment_terms = payment_terms.clone();
                }
            }
            OrderEvent::PricesResolved(prices) => {
                self.price_book = prices.clone();
                for line in &mut self.lines {
                    if let Some(price) = prices.get(&line.parent_sku) {
                        line.unit_price = price;
                        line.recompute();
                    }
                }
            }
            OrderEvent::StatusChanged { to, at, .. } => {
                self.status = *to;
                match to {
                    OrderStatus::Confirmed => self.confirmed_at = Some(*at),
                    OrderStatus::Shipped => self.shipped_at = Some(*at),
                    _ => {}
                }
            }
            OrderEvent::PaymentStatusChanged(status) => {
                self.payment_status = *status;
            }
            OrderEvent::NotesUpdated { shipping_address, internal_notes, customer_notes } => {
                self.shipping_address = shipping_address.clone();
                self.internal_notes = internal_notes.clone();
                self.customer_notes = customer_notes.clone();
            }
        }

        self.recompute_totals();
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
