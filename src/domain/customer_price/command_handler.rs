use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use uuid::Uuid;

use super::errors::PriceError;
use super::import::{parse_csv, parse_price, plan_import, render_csv, RowPlan};
use super::value_objects::{B2bCustomer, CustomerPrice, PriceBook};
use crate::metrics::Metrics;
use crate::store::B2bStore;

// ============================================================================
// Customer Price Command Handler
// ============================================================================
//
// Resolves negotiated prices for the order workflow and maintains the
// per-customer price list (single rows, bulk entry, CSV import/export).
//
// ============================================================================

/// Per-row tally of a bulk write
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BulkOutcome {
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub errors: Vec<String>,
}

impl BulkOutcome {
    pub fn message(&self) -> String {
        let mut message = format!("{} prices saved", self.succeeded);
        if self.failed > 0 {
            message.push_str(&format!(", {} failed", self.failed));
        }
        if self.skipped > 0 {
            message.push_str(&format!(", {} skipped", self.skipped));
        }
        message
    }

    fn fail(&mut self, parent_sku: &str, reason: impl std::fmt::Display) {
        self.failed += 1;
        self.errors.push(format!("{}: {}", parent_sku, reason));
    }
}

pub struct CustomerPriceCommandHandler {
    store: Arc<dyn B2bStore>,
    metrics: Arc<Metrics>,
}

impl CustomerPriceCommandHandler {
    pub fn new(store: Arc<dyn B2bStore>, metrics: Arc<Metrics>) -> Self {
        Self { store, metrics }
    }

    /// Every negotiated price of the customer; unknown customers have none
    pub async fn price_book(&self, customer_id: Uuid) -> Result<PriceBook> {
        let _timer = self.metrics.store_timer("customer_prices");
        let prices = self
            .store
            .customer_prices(customer_id)
            .await
            .context("Failed to load customer prices")?;

        tracing::debug!(
            customer_id = %customer_id,
            prices = prices.len(),
            "Loaded price book"
        );
        Ok(prices.iter().collect())
    }

    /// Negotiated prices for the given parent SKUs only
    pub async fn resolve(&self, customer_id: Uuid, parent_skus: &[String]) -> Result<PriceBook> {
        let book = self.price_book(customer_id).await?;
        Ok(book.restricted_to(parent_skus.iter().map(String::as_str)))
    }

    async fn customer(&self, customer_id: Uuid) -> Result<B2bCustomer> {
        self.store
            .customer(customer_id)
            .await?
            .ok_or_else(|| PriceError::CustomerNotFound(customer_id).into())
    }

    fn build_price(
        customer: &B2bCustomer,
        parent_sku: &str,
        raw_price: &str,
        notes: Option<String>,
    ) -> Result<CustomerPrice, PriceError> {
        let parent_sku = parent_sku.trim();
        if parent_sku.is_empty() {
            return Err(PriceError::EmptyParentSku);
        }
        let unit_price = parse_price(raw_price)?;
        Ok(CustomerPrice::new(customer.id, parent_sku, unit_price, &customer.currency)
            .with_notes(notes))
    }

    /// Register a new price; a second row for the same SKU is rejected
    pub async fn add_price(
        &self,
        customer_id: Uuid,
        parent_sku: &str,
        raw_price: &str,
        notes: Option<String>,
    ) -> Result<CustomerPrice> {
        let customer = self.customer(customer_id).await?;
        let price = Self::build_price(&customer, parent_sku, raw_price, notes).map_err(|e| {
            self.metrics.record_rejection("customer_price", "invalid_price");
            e
        })?;

        let _timer = self.metrics.store_timer("insert_customer_price");
        self.store.insert_customer_price(&price).await?;

        tracing::info!(
            customer_id = %customer_id,
            parent_sku = %price.parent_sku,
            unit_price = %price.unit_price,
            "Customer price registered"
        );
        Ok(price)
    }

    /// Change the price of an SKU, creating the row if needed
    pub async fn update_price(
        &self,
        customer_id: Uuid,
        parent_sku: &str,
        raw_price: &str,
        notes: Option<String>,
    ) -> Result<CustomerPrice> {
        let customer = self.customer(customer_id).await?;
        let price = Self::build_price(&customer, parent_sku, raw_price, notes)?;

        let _timer = self.metrics.store_timer("upsert_customer_price");
        self.store.upsert_customer_price(&price).await?;

        tracing::info!(
            customer_id = %customer_id,
            parent_sku = %price.parent_sku,
            unit_price = %price.unit_price,
            "Customer price updated"
        );
        Ok(price)
    }

    pub async fn delete_price(&self, price_id: Uuid, confirmed: bool) -> Result<()> {
        if !confirmed {
            self.metrics.record_rejection("customer_price", "delete_not_confirmed");
            return Err(PriceError::DeleteNotConfirmed.into());
        }

        let _timer = self.metrics.store_timer("delete_customer_price");
        self.store.delete_customer_price(price_id).await?;
        tracing::info!(price_id = %price_id, "Customer price deleted");
        Ok(())
    }

    /// Upsert many (parent SKU, raw price) pairs; blank rows are skipped
    pub async fn bulk_upsert(
        &self,
        customer_id: Uuid,
        items: &[(String, String)],
    ) -> Result<BulkOutcome> {
        let customer = self.customer(customer_id).await?;
        let mut outcome = BulkOutcome::default();

        for (parent_sku, raw_price) in items {
            if parent_sku.trim().is_empty() || raw_price.trim().is_empty() {
                outcome.skipped += 1;
                continue;
            }
            let price = match Self::build_price(&customer, parent_sku, raw_price, None) {
                Ok(price) => price,
                Err(e) => {
                    outcome.fail(parent_sku, e);
                    continue;
                }
            };
            match self.store.upsert_customer_price(&price).await {
                Ok(()) => outcome.succeeded += 1,
                Err(e) => outcome.fail(parent_sku, e),
            }
        }

        tracing::info!(
            customer_id = %customer_id,
            succeeded = outcome.succeeded,
            failed = outcome.failed,
            skipped = outcome.skipped,
            "Bulk price upsert finished"
        );
        Ok(outcome)
    }

    /// What an import of `csv` would do, without writing anything
    pub async fn preview_import(&self, customer_id: Uuid, csv: &str) -> Result<Vec<RowPlan>> {
        let rows = parse_csv(csv)?;
        let known: HashSet<String> = self
            .store
            .parent_products()
            .await?
            .into_iter()
            .map(|p| p.parent_sku)
            .collect();
        let existing = self.store.customer_prices(customer_id).await?;
        Ok(plan_import(&rows, &known, &existing))
    }

    /// Import a CSV price list in the customer's currency
    pub async fn import_csv(&self, customer_id: Uuid, csv: &str) -> Result<BulkOutcome> {
        let customer = self.customer(customer_id).await?;
        let plan = self.preview_import(customer_id, csv).await?;
        let mut outcome = BulkOutcome::default();

        for row in plan {
            match row {
                RowPlan::Upsert { parent_sku, unit_price, notes, .. } => {
                    let price = CustomerPrice::new(customer.id, &parent_sku, unit_price, &customer.currency)
                        .with_notes(notes);
                    match self.store.upsert_customer_price(&price).await {
                        Ok(()) => outcome.succeeded += 1,
                        Err(e) => outcome.fail(&parent_sku, e),
                    }
                }
                RowPlan::SkipUnknownSku { parent_sku } => {
                    tracing::debug!(parent_sku = %parent_sku, "Skipping CSV row for unknown SKU");
                    outcome.skipped += 1;
                }
                RowPlan::SkipInvalid { parent_sku, reason } => {
                    tracing::debug!(parent_sku = %parent_sku, reason = %reason, "Skipping invalid CSV row");
                    outcome.skipped += 1;
                }
            }
        }

        tracing::info!(
            customer_id = %customer_id,
            succeeded = outcome.succeeded,
            failed = outcome.failed,
            skipped = outcome.skipped,
            "CSV price import finished"
        );
        Ok(outcome)
    }

    pub async fn export_csv(&self, customer_id: Uuid) -> Result<String> {
        let prices = self.store.customer_prices(customer_id).await?;
        let products = self.store.parent_products().await?;
        let csv = render_csv(&prices, |sku| {
            products
                .iter()
                .find(|p| p.parent_sku == sku)
                .map(|p| p.product_name.as_str())
        })?;
        Ok(csv)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
