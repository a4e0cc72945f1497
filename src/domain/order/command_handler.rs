use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use uuid::Uuid;

use super::aggregate::OrderAggregate;
use super::commands::OrderCommand;
use super::errors::OrderError;
use super::events::OrderEvent;
use super::status::StatusEvent;
use super::value_objects::PaymentStatus;
use crate::domain::customer_price::CustomerPriceCommandHandler;
use crate::domain::numbering::{day_prefix, document_number, DocumentKind};
use crate::metrics::Metrics;
use crate::reducer::{Aggregate, DomainEvent};
use crate::store::{B2bStore, StoreError};

// ============================================================================
// Order Command Handler
// ============================================================================
//
// Orchestrates: Command → Aggregate → Events → (explicit save) → Store
//
// Draft edits are pure and stay in memory; only `save`, `change_status`,
// `change_payment_status` and `delete` touch the store.
//
// ============================================================================

pub struct OrderCommandHandler {
    store: Arc<dyn B2bStore>,
    prices: CustomerPriceCommandHandler,
    metrics: Arc<Metrics>,
}

impl OrderCommandHandler {
    pub fn new(store: Arc<dyn B2bStore>, metrics: Arc<Metrics>) -> Self {
        Self {
            prices: CustomerPriceCommandHandler::new(store.clone(), metrics.clone()),
            store,
            metrics,
        }
    }

    /// Start a quote with the next free order number for `today`
    pub async fn create_draft(&self, today: NaiveDate) -> Result<OrderAggregate> {
        let prefix = day_prefix(DocumentKind::Order, today);
        let existing = self
            .store
            .count_orders_with_prefix(&prefix)
            .await
            .context("Failed to count today's orders")?;

        let order = OrderAggregate::draft(
            document_number(DocumentKind::Order, today, existing),
            today,
        );
        tracing::debug!(
            order_id = %order.id,
            order_number = %order.order_number,
            "Draft order created"
        );
        Ok(order)
    }

    pub async fn load(&self, order_id: Uuid) -> Result<OrderAggregate> {
        let _timer = self.metrics.store_timer("load_order");
        match self.store.load_order(order_id).await {
            Ok(order) => Ok(order),
            Err(StoreError::NotFound { .. }) => Err(OrderError::NotFound(order_id).into()),
            Err(e) => Err(e).context("Failed to load order"),
        }
    }

    /// Run a command against the in-memory draft
    pub fn apply(&self, order: &mut OrderAggregate, command: &OrderCommand) -> Result<Vec<OrderEvent>> {
        match order.execute(command) {
            Ok(events) => {
                for event in &events {
                    tracing::debug!(
                        order_id = %order.id,
                        event_type = event.event_type(),
                        "Order event applied"
                    );
                    self.metrics.record_event("order", event.event_type());
                }
                Ok(events)
            }
            Err(e) => {
                tracing::warn!(order_id = %order.id, error = %e, "Order command rejected");
                self.metrics.record_rejection("order", rejection_reason(&e));
                Err(e.into())
            }
        }
    }

    /// Attach (or switch) the customer and re-price every line from its book
    pub async fn attach_customer(&self, order: &mut OrderAggregate, customer_id: Uuid) -> Result<()> {
        let customer = self
            .store
            .customer(customer_id)
            .await
            .context("Failed to load customer")?;
        let prices = self.prices.price_book(customer_id).await?;

        if prices.is_empty() {
            tracing::info!(
                order_id = %order.id,
                customer_id = %customer_id,
                "Customer has no negotiated prices"
            );
        }

        self.apply(
            order,
            &OrderCommand::AttachCustomer {
                customer_id,
                customer,
                prices,
            },
        )?;
        Ok(())
    }

    /// Persist the whole order (header and full line list) as one unit
    pub async fn save(&self, order: &OrderAggregate) -> Result<()> {
        if let Err(e) = order.validate_for_save() {
            self.metrics.record_rejection("order", rejection_reason(&e));
            return Err(e.into());
        }

        let _timer = self.metrics.store_timer("save_order");
        self.store
            .save_order(order)
            .await
            .context("Failed to save order")?;
        self.metrics.orders_saved.inc();

        tracing::info!(
            order_id = %order.id,
            order_number = %order.order_number,
            status = %order.status,
            lines = order.lines.len(),
            total = %order.totals.total,
            "Order saved"
        );
        Ok(())
    }

    async fn load_apply_save(&self, order_id: Uuid, command: OrderCommand) -> Result<OrderAggregate> {
        let mut order = self.load(order_id).await?;
        let events = self.apply(&mut order, &command)?;
        if !events.is_empty() {
            self.save(&order).await?;
        }
        Ok(order)
    }

    pub async fn change_status(&self, order_id: Uuid, event: StatusEvent) -> Result<OrderAggregate> {
        let order = self
            .load_apply_save(order_id, OrderCommand::ChangeStatus(event))
            .await?;
        tracing::info!(order_id = %order_id, status = %order.status, "Order status changed");
        Ok(order)
    }

    pub async fn change_payment_status(
        &self,
        order_id: Uuid,
        status: PaymentStatus,
    ) -> Result<OrderAggregate> {
        self.load_apply_save(order_id, OrderCommand::ChangePaymentStatus(status))
            .await
    }

    /// Delete the order together with its shipments
    pub async fn delete(&self, order_id: Uuid, confirmed: bool) -> Result<()> {
        if !confirmed {
            self.metrics.record_rejection("order", "delete_not_confirmed");
            return Err(OrderError::DeleteNotConfirmed.into());
        }

        let _timer = self.metrics.store_timer("delete_order");
        match self.store.delete_order(order_id).await {
            Ok(()) => {
                tracing::info!(order_id = %order_id, "Order deleted");
                Ok(())
            }
            Err(StoreError::NotFound { .. }) => Err(OrderError::NotFound(order_id).into()),
            Err(e) => Err(e).context("Failed to delete order"),
        }
    }
}

pub(crate) fn rejection_reason(error: &OrderError) -> &'static str {
    match error {
        OrderError::AlreadyCancelled => "already_cancelled",
        OrderError::InvalidStatusTransition { .. } => "invalid_transition",
        OrderError::LineNotFound(_) => "line_not_found",
        OrderError::EmptyParentSku => "empty_parent_sku",
        OrderError::InvalidQuantity(_) => "invalid_quantity",
        OrderError::CustomerRequired => "customer_required",
        OrderError::NotFound(_) => "not_found",
        OrderError::DeleteNotConfirmed => "delete_not_confirmed",
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::customer_price::{B2bCustomer, CustomerPrice};
    use crate::domain::order::{LineField, OrderStatus};
    use crate::store::MemoryStore;
    use rust_decimal::Decimal;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 5, 4).unwrap()
    }

    fn customer(currency: &str) -> B2bCustomer {
        B2bCustomer {
            id: Uuid::new_v4(),
            customer_code: "B2B-0007".to_string(),
            company_name: "Nursery Co".to_string(),
            currency: currency.to_string(),
            payment_terms: Some("NET30".to_string()),
            is_active: true,
        }
    }

    async fn setup() -> (Arc<MemoryStore>, OrderCommandHandler) {
        let store = Arc::new(MemoryStore::new());
        let handler = OrderCommandHandler::new(store.clone(), Arc::new(Metrics::new().unwrap()));
        (store, handler)
    }

    fn add_line(handler: &OrderCommandHandler, order: &mut OrderAggregate, sku: &str, qty: i32) {
        handler
            .apply(
                order,
                &OrderCommand::AddLine {
                    parent_sku: sku.to_string(),
                    product_name: sku.to_string(),
                    quantity: qty,
                },
            )
            .unwrap();
    }

    #[tokio::test]
    async fn test_order_numbers_count_up_per_day() {
        let (store, handler) = setup().await;
        let c = customer("KRW");
        store.add_customer(c.clone()).await;

        let mut first = handler.create_draft(today()).await.unwrap();
        assert_eq!(first.order_number, "B2B-20260504-0001");
        handler.attach_customer(&mut first, c.id).await.unwrap();
        handler.save(&first).await.unwrap();

        let second = handler.create_draft(today()).await.unwrap();
        assert_eq!(second.order_number, "B2B-20260504-0002");
    }

    #[tokio::test]
    async fn test_save_without_customer_is_rejected() {
        let (_store, handler) = setup().await;
        let order = handler.create_draft(today()).await.unwrap();

        let err = handler.save(&order).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<OrderError>(),
            Some(OrderError::CustomerRequired)
        ));
        assert!(handler.load(order.id).await.is_err());
    }

    #[tokio::test]
    async fn test_customer_switch_reprices_lines() {
        let (store, handler) = setup().await;
        let a = customer("KRW");
        let b = customer("USD");
        store.add_customer(a.clone()).await;
        store.add_customer(b.clone()).await;
        store
            .insert_customer_price(&CustomerPrice::new(a.id, "X", Decimal::from(100), "KRW"))
            .await
            .unwrap();
        store
            .insert_customer_price(&CustomerPrice::new(b.id, "X", Decimal::from(150), "USD"))
            .await
            .unwrap();

        let mut order = handler.create_draft(today()).await.unwrap();
        add_line(&handler, &mut order, "X", 2);
        handler.attach_customer(&mut order, a.id).await.unwrap();
        assert_eq!(order.line("X").unwrap().unit_price, Decimal::from(100));

        handler.attach_customer(&mut order, b.id).await.unwrap();
        assert_eq!(order.line("X").unwrap().unit_price, Decimal::from(150));
        assert_eq!(order.currency, "USD");
        assert_eq!(order.totals.total, Decimal::from(300));
    }

    #[tokio::test]
    async fn test_save_then_load_round_trips_lines_and_totals() {
        let (store, handler) = setup().await;
        let c = customer("KRW");
        store.add_customer(c.clone()).await;

        let mut order = handler.create_draft(today()).await.unwrap();
        handler.attach_customer(&mut order, c.id).await.unwrap();
        add_line(&handler, &mut order, "P1", 10);
        handler
            .apply(
                &mut order,
                &OrderCommand::SetLineField {
                    parent_sku: "P1".to_string(),
                    field: LineField::UnitPrice,
                    raw: "1000".to_string(),
                },
            )
            .unwrap();
        handler.save(&order).await.unwrap();

        let loaded = handler.load(order.id).await.unwrap();
        assert_eq!(loaded.lines, order.lines);
        assert_eq!(loaded.totals.total, Decimal::from(10000));
    }

    #[tokio::test]
    async fn test_cancelled_order_cannot_be_reopened() {
        let (store, handler) = setup().await;
        let c = customer("KRW");
        store.add_customer(c.clone()).await;
        let mut order = handler.create_draft(today()).await.unwrap();
        handler.attach_customer(&mut order, c.id).await.unwrap();
        handler.save(&order).await.unwrap();

        handler
            .change_status(order.id, StatusEvent::Selected(OrderStatus::Cancelled))
            .await
            .unwrap();
        let err = handler
            .change_status(order.id, StatusEvent::Selected(OrderStatus::Confirmed))
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<OrderError>(),
            Some(OrderError::AlreadyCancelled)
        ));
        assert_eq!(
            handler.load(order.id).await.unwrap().status,
            OrderStatus::Cancelled
        );
    }

    #[tokio::test]
    async fn test_payment_status_is_persisted() {
        let (store, handler) = setup().await;
        let c = customer("KRW");
        store.add_customer(c.clone()).await;
        let mut order = handler.create_draft(today()).await.unwrap();
        handler.attach_customer(&mut order, c.id).await.unwrap();
        handler.save(&order).await.unwrap();

        handler
            .change_payment_status(order.id, PaymentStatus::Partial)
            .await
            .unwrap();
        assert_eq!(
            handler.load(order.id).await.unwrap().payment_status,
            PaymentStatus::Partial
        );
    }

    #[tokio::test]
    async fn test_delete_requires_confirmation() {
        let (store, handler) = setup().await;
        let c = customer("KRW");
        store.add_customer(c.clone()).await;
        let mut order = handler.create_draft(today()).await.unwrap();
        handler.attach_customer(&mut order, c.id).await.unwrap();
        handler.save(&order).await.unwrap();

        assert!(handler.delete(order.id, false).await.is_err());
        assert!(handler.load(order.id).await.is_ok());

        handler.delete(order.id, true).await.unwrap();
        let err = handler.load(order.id).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<OrderError>(),
            Some(OrderError::NotFound(_))
        ));
    }
}
