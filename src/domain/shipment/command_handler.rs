use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use uuid::Uuid;

use super::catalog::{SkuCatalog, StockSnapshot};
use super::commands::ShipmentCommand;
use super::draft::ShipmentDraft;
use super::errors::ShipmentError;
use super::events::ShipmentEvent;
use super::inventory::inventory_effects;
use super::reconciliation::{active_lines, reconcile, ReconciliationReport};
use super::value_objects::{Shipment, ShipmentHeader, ShipmentStatus, Warehouse};
use crate::domain::numbering::{day_prefix, document_number, DocumentKind};
use crate::domain::order::{OrderAggregate, OrderCommandHandler, OrderStatus, StatusEvent};
use crate::metrics::Metrics;
use crate::reducer::{Aggregate, DomainEvent};
use crate::store::{B2bStore, StoreError};
use crate::utils::{retry_on_transient, RetryConfig, RetryResult};

// ============================================================================
// Shipment Command Handler
// ============================================================================
//
// open_draft:    order + catalog + warehouses + stock snapshot + history
// apply:         Command → ShipmentDraft → Events (soft stock warnings)
// commit:        header, then lines; a failed line insert deletes the header
// change_status: status write, inventory effects, order status follow-up
//
// ============================================================================

/// Everything the shipment form works against, read once at open time
pub struct ShipmentWorkspace {
    pub order: OrderAggregate,
    pub catalog: SkuCatalog,
    pub warehouses: Vec<Warehouse>,
    /// Shipments already recorded for the order, cancelled ones included
    pub committed: Vec<Shipment>,
    pub draft: ShipmentDraft,
}

impl ShipmentWorkspace {
    /// Shipped-to-date per order line: committed shipments plus the draft
    pub fn report(&self) -> ReconciliationReport {
        reconcile(
            &self.order.lines,
            &self.catalog,
            active_lines(&self.committed).chain(self.draft.lines.iter()),
        )
    }

    pub fn snapshot_taken_at(&self) -> DateTime<Utc> {
        self.draft.snapshot().taken_at()
    }

    pub fn snapshot_age(&self, now: DateTime<Utc>) -> Duration {
        self.draft.snapshot_age(now)
    }

    /// Build an add command for a child SKU of one of the order's lines
    pub fn add_sku(&self, sku: &str, quantity: i32) -> Result<ShipmentCommand, ShipmentError> {
        let child = self
            .catalog
            .child(sku)
            .ok_or_else(|| ShipmentError::UnknownSku(sku.to_string()))?;
        let order_line_id = self.order.line(&child.parent_sku).map(|l| l.id);
        Ok(ShipmentCommand::AddSku {
            child: child.clone(),
            order_line_id,
            quantity,
        })
    }
}

pub struct ShipmentCommandHandler {
    store: Arc<dyn B2bStore>,
    orders: OrderCommandHandler,
    metrics: Arc<Metrics>,
    low_stock_threshold: i32,
}

impl ShipmentCommandHandler {
    pub fn new(store: Arc<dyn B2bStore>, metrics: Arc<Metrics>, low_stock_threshold: i32) -> Self {
        Self {
            orders: OrderCommandHandler::new(store.clone(), metrics.clone()),
            store,
            metrics,
            low_stock_threshold,
        }
    }

    fn reject(&self, error: ShipmentError) -> anyhow::Error {
        tracing::warn!(reason = error.reason(), error = %error, "Shipment command rejected");
        self.metrics.record_rejection("shipment", error.reason());
        error.into()
    }

    /// Load everything the shipment form needs for one order
    pub async fn open_draft(&self, order_id: Uuid) -> Result<ShipmentWorkspace> {
        let order = self.orders.load(order_id).await?;
        let parent_skus = order.parent_skus();

        let products = {
            let _timer = self.metrics.store_timer("child_skus");
            self.store.child_skus(&parent_skus).await?
        };
        let catalog = SkuCatalog::build(products, &parent_skus);
        for parent in catalog.parents_without_skus() {
            tracing::info!(order_id = %order_id, parent_sku = %parent, "Order line has no SKUs");
        }

        let warehouses: Vec<Warehouse> = self
            .store
            .warehouses()
            .await?
            .into_iter()
            .filter(|w| w.is_active)
            .collect();

        let locations = {
            let _timer = self.metrics.store_timer("inventory_locations");
            self.store.inventory_locations(&catalog.child_skus()).await?
        };
        let snapshot = StockSnapshot::new(locations, Utc::now());

        let committed = self
            .store
            .shipments_for_order(order_id)
            .await
            .context("Failed to load existing shipments")?;

        tracing::debug!(
            order_id = %order_id,
            child_skus = catalog.child_skus().len(),
            warehouses = warehouses.len(),
            shipments = committed.len(),
            "Shipment draft opened"
        );

        Ok(ShipmentWorkspace {
            draft: ShipmentDraft::new(order.id, snapshot, self.low_stock_threshold),
            order,
            catalog,
            warehouses,
            committed,
        })
    }

    /// Run a command against the in-memory draft
    pub fn apply(&self, workspace: &mut ShipmentWorkspace, command: &ShipmentCommand) -> Result<Vec<ShipmentEvent>> {
        if let ShipmentCommand::SelectWarehouse(warehouse_id) = command {
            if !workspace.warehouses.iter().any(|w| w.id == *warehouse_id) {
                return Err(self.reject(ShipmentError::UnknownWarehouse(*warehouse_id)));
            }
        }

        let events = workspace
            .draft
            .execute(command)
            .map_err(|e| self.reject(e))?;

        for event in &events {
            self.metrics.record_event("shipment", event.event_type());
            if let Some((sku, stock)) = event.stock() {
                if stock.is_short() {
                    tracing::warn!(
                        order_id = %workspace.order.id,
                        sku = %sku,
                        on_hand = stock.on_hand,
                        requested = stock.requested + stock.already_added,
                        shortfall = stock.shortfall(),
                        "Requested quantity exceeds stock on hand"
                    );
                    self.metrics.stock_warnings.inc();
                }
            }
        }
        Ok(events)
    }

    /// Persist the draft as a new shipment
    pub async fn commit(&self, workspace: &ShipmentWorkspace, today: NaiveDate) -> Result<Shipment> {
        let order = &workspace.order;
        // The workspace copy may be stale; cancellation is checked on a fresh read
        let current = self.orders.load(order.id).await?;
        if current.status == OrderStatus::Cancelled {
            return Err(self.reject(ShipmentError::OrderCancelled));
        }
        let warehouse_id = workspace.draft.validate().map_err(|e| self.reject(e))?;
        if !workspace.warehouses.iter().any(|w| w.id == warehouse_id) {
            return Err(self.reject(ShipmentError::UnknownWarehouse(warehouse_id)));
        }

        let prefix = day_prefix(DocumentKind::Shipment, today);
        let existing = self
            .store
            .count_shipments_with_prefix(&prefix)
            .await
            .context("Failed to count today's shipments")?;
        let number = document_number(DocumentKind::Shipment, today, existing);
        let shipment = workspace
            .draft
            .to_shipment(number, Utc::now())
            .map_err(|e| self.reject(e))?;

        {
            let _timer = self.metrics.store_timer("insert_shipment_header");
            self.store
                .insert_shipment_header(&shipment.header)
                .await
                .context("Failed to create shipment")?;
        }

        let inserted = {
            let _timer = self.metrics.store_timer("insert_shipment_lines");
            self.store
                .insert_shipment_lines(shipment.header.id, &shipment.lines)
                .await
        };
        if let Err(e) = inserted {
            tracing::warn!(
                shipment_number = %shipment.header.shipment_number,
                error = %e,
                "Shipment line insert failed, removing header"
            );
            self.roll_back(&shipment.header).await;
            return Err(anyhow::Error::new(e).context(format!(
                "Failed to save shipment {}",
                shipment.header.shipment_number
            )));
        }

        self.metrics.shipments_committed.inc();
        tracing::info!(
            order_id = %order.id,
            shipment_number = %shipment.header.shipment_number,
            warehouse_id = %warehouse_id,
            lines = shipment.lines.len(),
            quantity = shipment.total_quantity(),
            "Shipment committed"
        );

        for line in workspace.report().over_shipped() {
            tracing::warn!(
                order_id = %order.id,
                parent_sku = %line.parent_sku,
                ordered = line.ordered,
                shipped = line.shipped,
                "Order line is over-shipped"
            );
            self.metrics.over_shipments.inc();
        }

        self.mark_order_shipping(order.id, shipment.header.id).await;
        Ok(shipment)
    }

    /// Delete a header whose lines never made it
    async fn roll_back(&self, header: &ShipmentHeader) {
        let store = self.store.clone();
        let shipment_id = header.id;
        let result = retry_on_transient(RetryConfig::compensation(), move |_attempt| {
            let store = store.clone();
            async move { store.delete_shipment(shipment_id).await }
        })
        .await;

        match result {
            RetryResult::Success(()) => {
                self.metrics.shipment_rollbacks.inc();
                tracing::info!(
                    shipment_number = %header.shipment_number,
                    "Shipment header rolled back"
                );
            }
            RetryResult::Failed(e) | RetryResult::PermanentFailure(e) => {
                tracing::error!(
                    shipment_id = %shipment_id,
                    shipment_number = %header.shipment_number,
                    error = %e,
                    "Failed to roll back shipment header, empty shipment left behind"
                );
            }
        }
    }

    /// The order's first shipment moves it to `shipping`
    async fn mark_order_shipping(&self, order_id: Uuid, shipment_id: Uuid) {
        let others = match self.store.shipments_for_order(order_id).await {
            Ok(shipments) => shipments
                .iter()
                .filter(|s| s.header.id != shipment_id && s.header.status != ShipmentStatus::Cancelled)
                .count(),
            Err(e) => {
                tracing::error!(order_id = %order_id, error = %e, "Failed to list shipments");
                return;
            }
        };
        if others > 0 {
            return;
        }

        if let Err(e) = self
            .orders
            .change_status(order_id, StatusEvent::FirstShipmentCreated)
            .await
        {
            tracing::error!(
                order_id = %order_id,
                error = %e,
                "Shipment saved but order status was not updated"
            );
        }
    }

    pub async fn load(&self, shipment_id: Uuid) -> Result<Shipment> {
        match self.store.load_shipment(shipment_id).await {
            Ok(shipment) => Ok(shipment),
            Err(StoreError::NotFound { .. }) => Err(ShipmentError::NotFound(shipment_id).into()),
            Err(e) => Err(e).context("Failed to load shipment"),
        }
    }

    /// Move a committed shipment through its lifecycle
    pub async fn change_status(
        &self,
        shipment_id: Uuid,
        to: ShipmentStatus,
        tracking_number: Option<String>,
        today: NaiveDate,
    ) -> Result<Shipment> {
        let mut shipment = self.load(shipment_id).await?;
        let from = shipment.header.status;
        if from == to {
            return Ok(shipment);
        }
        from.check_transition(to).map_err(|e| self.reject(e))?;

        let order_id = shipment.header.order_id;
        if to == ShipmentStatus::Shipped {
            let order = self.orders.load(order_id).await?;
            if order.status == OrderStatus::Cancelled {
                return Err(self.reject(ShipmentError::OrderCancelled));
            }
        }

        let effects = inventory_effects(&shipment, to);

        shipment.header.status = to;
        if to == ShipmentStatus::Shipped {
            shipment.header.shipped_date = Some(today);
            if let Some(tracking) = tracking_number.filter(|t| !t.trim().is_empty()) {
                shipment.header.tracking_number = Some(tracking);
            }
        }
        {
            let _timer = self.metrics.store_timer("update_shipment_header");
            self.store
                .update_shipment_header(&shipment.header)
                .await
                .context("Failed to update shipment status")?;
        }
        tracing::info!(
            shipment_number = %shipment.header.shipment_number,
            from = %from,
            to = %to,
            "Shipment status changed"
        );

        for adjustment in &effects {
            if let Err(e) = self.store.adjust_inventory(adjustment).await {
                tracing::error!(
                    shipment_number = %shipment.header.shipment_number,
                    sku = %adjustment.sku,
                    delta = adjustment.delta,
                    error = %e,
                    "Inventory adjustment failed"
                );
            }
        }

        if to == ShipmentStatus::Shipped {
            self.orders
                .change_status(order_id, StatusEvent::ShipmentDispatched)
                .await
                .context("Shipment shipped but order status was not updated")?;
        }
        Ok(shipment)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::customer_price::B2bCustomer;
    use crate::domain::order::OrderCommand;
    use crate::domain::shipment::{ChildSku, ParentProduct};
    use crate::store::{FailPoint, MemoryStore};

    struct Fixture {
        store: Arc<MemoryStore>,
        handler: ShipmentCommandHandler,
        orders: OrderCommandHandler,
        order_id: Uuid,
        warehouse_id: Uuid,
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 6, 1).unwrap()
    }

    fn child(sku: &str, parent: &str, color: &str) -> ChildSku {
        ChildSku {
            product_id: Uuid::new_v4(),
            sku: sku.to_string(),
            parent_sku: parent.to_string(),
            product_name: format!("{parent} crib"),
            color: Some(color.to_string()),
            size: Some("M".to_string()),
        }
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let metrics = Arc::new(Metrics::new().unwrap());

        let customer = B2bCustomer {
            id: Uuid::new_v4(),
            customer_code: "B2B-0100".to_string(),
            company_name: "Kids Mart".to_string(),
            currency: "KRW".to_string(),
            payment_terms: None,
            is_active: true,
        };
        store.add_customer(customer.clone()).await;
        for parent in ["P1", "P2"] {
            store
                .add_parent_product(ParentProduct {
                    parent_sku: parent.to_string(),
                    product_name: format!("{parent} crib"),
                    category: None,
                })
                .await;
        }
        store.add_child_sku(child("P1-RED-M", "P1", "RED")).await;
        store.add_child_sku(child("P1-BLUE-M", "P1", "BLUE")).await;

        let warehouse_id = Uuid::new_v4();
        store
            .add_warehouse(Warehouse {
                id: warehouse_id,
                code: "WH-SEOUL".to_string(),
                name: "Seoul".to_string(),
                is_active: true,
            })
            .await;
        store.set_stock(warehouse_id, "P1-RED-M", 5).await;
        store.set_stock(warehouse_id, "P1-BLUE-M", 30).await;

        let orders = OrderCommandHandler::new(store.clone(), metrics.clone());
        let mut order = orders.create_draft(today()).await.unwrap();
        orders.attach_customer(&mut order, customer.id).await.unwrap();
        for (sku, qty) in [("P1", 10), ("P2", 2)] {
            orders
                .apply(
                    &mut order,
                    &OrderCommand::AddLine {
                        parent_sku: sku.to_string(),
                        product_name: format!("{sku} crib"),
                        quantity: qty,
                    },
                )
                .unwrap();
        }
        orders.save(&order).await.unwrap();

        Fixture {
            handler: ShipmentCommandHandler::new(store.clone(), metrics, 10),
            store,
            orders,
            order_id: order.id,
            warehouse_id,
        }
    }

    async fn draft_with(f: &Fixture, adds: &[(&str, i32)]) -> ShipmentWorkspace {
        let mut ws = f.handler.open_draft(f.order_id).await.unwrap();
        f.handler
            .apply(&mut ws, &ShipmentCommand::SelectWarehouse(f.warehouse_id))
            .unwrap();
        for (sku, qty) in adds {
            let command = ws.add_sku(sku, *qty).unwrap();
            f.handler.apply(&mut ws, &command).unwrap();
        }
        ws
    }

    #[tokio::test]
    async fn test_open_draft_expands_order_lines() {
        let f = fixture().await;
        let ws = f.handler.open_draft(f.order_id).await.unwrap();

        assert_eq!(ws.catalog.children("P1").len(), 2);
        assert_eq!(ws.catalog.parents_without_skus(), vec!["P2"]);
        assert_eq!(ws.warehouses.len(), 1);
        assert_eq!(ws.draft.snapshot().on_hand(f.warehouse_id, "P1-BLUE-M"), 30);
        assert!(ws.snapshot_age(Utc::now()) >= Duration::zero());
        assert!(ws.report().line("P2").unwrap().no_skus);
    }

    #[tokio::test]
    async fn test_scenario_c_commit_fulfils_line_and_starts_shipping() {
        let f = fixture().await;
        let ws = draft_with(&f, &[("P1-BLUE-M", 4), ("P1-BLUE-M", 6)]).await;
        assert_eq!(ws.draft.lines.len(), 1);

        let shipment = f.handler.commit(&ws, today()).await.unwrap();
        assert_eq!(shipment.header.shipment_number, "SHP-20260601-0001");
        assert_eq!(shipment.lines[0].quantity, 10);

        let reopened = f.handler.open_draft(f.order_id).await.unwrap();
        let p1 = reopened.report().line("P1").cloned().unwrap();
        assert_eq!(p1.remaining, 0);
        assert_eq!(p1.state, crate::domain::shipment::FulfillmentState::Fulfilled);

        let order = f.orders.load(f.order_id).await.unwrap();
        assert_eq!(order.status, OrderStatus::Shipping);
    }

    #[tokio::test]
    async fn test_scenario_d_over_shipment_still_commits() {
        let f = fixture().await;
        let ws = draft_with(&f, &[("P1-BLUE-M", 4), ("P1-BLUE-M", 10)]).await;
        assert_eq!(ws.report().line("P1").unwrap().remaining, -4);

        f.handler.commit(&ws, today()).await.unwrap();
        assert_eq!(f.handler.metrics.over_shipments.get(), 1);
        assert_eq!(f.store.shipments_for_order(f.order_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_scenario_e_shortfall_warns_without_blocking() {
        let f = fixture().await;
        let ws = draft_with(&f, &[("P1-RED-M", 10)]).await;

        let stock = ws.draft.line("P1-RED-M").unwrap().stock.unwrap();
        assert_eq!(stock.shortfall(), 5);
        assert_eq!(f.handler.metrics.stock_warnings.get(), 1);
        assert!(f.handler.commit(&ws, today()).await.is_ok());
    }

    #[tokio::test]
    async fn test_failed_line_insert_removes_header() {
        let f = fixture().await;
        let ws = draft_with(&f, &[("P1-BLUE-M", 3)]).await;
        f.store.fail_next(FailPoint::InsertShipmentLines, 1).await;

        assert!(f.handler.commit(&ws, today()).await.is_err());
        assert!(f.store.shipments_for_order(f.order_id).await.unwrap().is_empty());
        assert_eq!(f.handler.metrics.shipment_rollbacks.get(), 1);

        let order = f.orders.load(f.order_id).await.unwrap();
        assert_eq!(order.status, OrderStatus::QuoteDraft);
    }

    #[tokio::test]
    async fn test_rollback_retries_transient_delete_failures() {
        let f = fixture().await;
        let ws = draft_with(&f, &[("P1-BLUE-M", 3)]).await;
        f.store.fail_next(FailPoint::InsertShipmentLines, 1).await;
        f.store.fail_next(FailPoint::DeleteShipment, 2).await;

        assert!(f.handler.commit(&ws, today()).await.is_err());
        assert!(f.store.shipments_for_order(f.order_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_commit_requires_warehouse() {
        let f = fixture().await;
        let mut ws = f.handler.open_draft(f.order_id).await.unwrap();
        let command = ws.add_sku("P1-BLUE-M", 1).unwrap();
        f.handler.apply(&mut ws, &command).unwrap();

        let err = f.handler.commit(&ws, today()).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ShipmentError>(),
            Some(ShipmentError::WarehouseRequired)
        ));
        assert!(f.store.shipments_for_order(f.order_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_warehouse_is_rejected() {
        let f = fixture().await;
        let mut ws = f.handler.open_draft(f.order_id).await.unwrap();
        let result = f
            .handler
            .apply(&mut ws, &ShipmentCommand::SelectWarehouse(Uuid::new_v4()));
        assert!(result.is_err());
        assert!(ws.draft.warehouse_id.is_none());
    }

    #[tokio::test]
    async fn test_cancelled_order_cannot_be_shipped() {
        let f = fixture().await;
        let ws = draft_with(&f, &[("P1-BLUE-M", 1)]).await;
        f.orders
            .change_status(f.order_id, StatusEvent::Selected(OrderStatus::Cancelled))
            .await
            .unwrap();
        let ws = ShipmentWorkspace {
            order: f.orders.load(f.order_id).await.unwrap(),
            ..ws
        };

        let err = f.handler.commit(&ws, today()).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ShipmentError>(),
            Some(ShipmentError::OrderCancelled)
        ));
        assert!(f.store.shipments_for_order(f.order_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_order_cancelled_after_draft_opened_blocks_commit() {
        let f = fixture().await;
        let ws = draft_with(&f, &[("P1-BLUE-M", 1)]).await;
        assert_eq!(ws.order.status, OrderStatus::QuoteDraft);

        f.orders
            .change_status(f.order_id, StatusEvent::Selected(OrderStatus::Cancelled))
            .await
            .unwrap();

        let err = f.handler.commit(&ws, today()).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ShipmentError>(),
            Some(ShipmentError::OrderCancelled)
        ));
        assert!(f.store.shipments_for_order(f.order_id).await.unwrap().is_empty());
        assert_eq!(
            f.orders.load(f.order_id).await.unwrap().status,
            OrderStatus::Cancelled
        );
    }

    #[tokio::test]
    async fn test_shipping_deducts_stock_and_marks_order_shipped() {
        let f = fixture().await;
        let ws = draft_with(&f, &[("P1-BLUE-M", 7)]).await;
        let shipment = f.handler.commit(&ws, today()).await.unwrap();

        let shipped = f
            .handler
            .change_status(
                shipment.header.id,
                ShipmentStatus::Shipped,
                Some("TRK-123".to_string()),
                today(),
            )
            .await
            .unwrap();

        assert_eq!(shipped.header.shipped_date, Some(today()));
        assert_eq!(shipped.header.tracking_number.as_deref(), Some("TRK-123"));
        assert_eq!(f.store.stock(f.warehouse_id, "P1-BLUE-M").await, 23);

        let order = f.orders.load(f.order_id).await.unwrap();
        assert_eq!(order.status, OrderStatus::Shipped);
        assert!(order.shipped_at.is_some());
    }

    #[tokio::test]
    async fn test_cancelling_shipped_shipment_restores_stock() {
        let f = fixture().await;
        let ws = draft_with(&f, &[("P1-BLUE-M", 7)]).await;
        let shipment = f.handler.commit(&ws, today()).await.unwrap();
        f.handler
            .change_status(shipment.header.id, ShipmentStatus::Shipped, None, today())
            .await
            .unwrap();
        f.handler
            .change_status(shipment.header.id, ShipmentStatus::Cancelled, None, today())
            .await
            .unwrap();

        assert_eq!(f.store.stock(f.warehouse_id, "P1-BLUE-M").await, 30);
        let reopened = f.handler.open_draft(f.order_id).await.unwrap();
        assert_eq!(reopened.report().line("P1").unwrap().shipped, 0);
    }

    #[tokio::test]
    async fn test_failed_inventory_adjustment_does_not_block_status() {
        let f = fixture().await;
        let ws = draft_with(&f, &[("P1-BLUE-M", 2)]).await;
        let shipment = f.handler.commit(&ws, today()).await.unwrap();
        f.store.fail_next(FailPoint::AdjustInventory, 1).await;

        let shipped = f
            .handler
            .change_status(shipment.header.id, ShipmentStatus::Shipped, None, today())
            .await
            .unwrap();
        assert_eq!(shipped.header.status, ShipmentStatus::Shipped);
        assert_eq!(f.store.stock(f.warehouse_id, "P1-BLUE-M").await, 30);
    }

    #[tokio::test]
    async fn test_second_shipment_leaves_order_status_alone() {
        let f = fixture().await;
        let first = draft_with(&f, &[("P1-BLUE-M", 5)]).await;
        let shipment = f.handler.commit(&first, today()).await.unwrap();
        f.handler
            .change_status(shipment.header.id, ShipmentStatus::Shipped, None, today())
            .await
            .unwrap();

        let second = draft_with(&f, &[("P1-BLUE-M", 5)]).await;
        let next = f.handler.commit(&second, today()).await.unwrap();
        assert_eq!(next.header.shipment_number, "SHP-20260601-0002");

        let order = f.orders.load(f.order_id).await.unwrap();
        assert_eq!(order.status, OrderStatus::Shipped);
    }

    #[tokio::test]
    async fn test_shipped_shipment_cannot_go_back_to_pending() {
        let f = fixture().await;
        let ws = draft_with(&f, &[("P1-BLUE-M", 1)]).await;
        let shipment = f.handler.commit(&ws, today()).await.unwrap();
        f.handler
            .change_status(shipment.header.id, ShipmentStatus::Shipped, None, today())
            .await
            .unwrap();

        let err = f
            .handler
            .change_status(shipment.header.id, ShipmentStatus::Pending, None, today())
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ShipmentError>(),
            Some(ShipmentError::InvalidTransition { .. })
        ));
    }

    #[tokio::test]
    async fn test_deleting_order_cascades_to_shipments() {
        let f = fixture().await;
        let ws = draft_with(&f, &[("P1-BLUE-M", 1)]).await;
        let shipment = f.handler.commit(&ws, today()).await.unwrap();

        f.orders.delete(f.order_id, true).await.unwrap();
        let err = f.handler.load(shipment.header.id).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ShipmentError>(),
            Some(ShipmentError::NotFound(_))
        ));
    }

    #[test]
    fn test_unknown_sku_cannot_be_added() {
        let order = OrderAggregate::draft("B2B-20260601-0001", today());
        let ws = ShipmentWorkspace {
            draft: ShipmentDraft::new(order.id, StockSnapshot::empty(Utc::now()), 10),
            order,
            catalog: SkuCatalog::default(),
            warehouses: vec![],
            committed: vec![],
        };
        assert!(matches!(
            ws.add_sku("NOPE", 1),
            Err(ShipmentError::UnknownSku(_))
        ));
    }
}
