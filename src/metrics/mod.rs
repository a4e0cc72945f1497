mod health;
mod server;

use prometheus::{
    HistogramOpts, HistogramTimer, HistogramVec, IntCounter, IntCounterVec, Opts, Registry,
};

// Re-export for public API
pub use health::{check_store, watch_store, HealthReport, HealthState};
pub use server::start_metrics_server;

// ============================================================================
// Metrics Module - Prometheus metrics for observability
// ============================================================================
//
// Provides metrics for:
// - Accepted and rejected commands per aggregate
// - Order saves, shipment commits and compensating rollbacks
// - Soft-check warnings (stock shortfall, over-shipment)
// - Store call latency
//
// All metrics are registered with Prometheus and can be scraped via /metrics
// ============================================================================

/// Central metrics registry for the entire application
pub struct Metrics {
    registry: Registry,

    // Command Metrics
    pub commands_total: IntCounterVec,
    pub commands_rejected: IntCounterVec,

    // Write Metrics
    pub orders_saved: IntCounter,
    pub shipments_committed: IntCounter,
    pub shipment_rollbacks: IntCounter,

    // Soft-check Metrics
    pub stock_warnings: IntCounter,
    pub over_shipments: IntCounter,

    // Store Metrics
    pub store_duration: HistogramVec,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        // Command Metrics
        let commands_total = IntCounterVec::new(
            Opts::new("b2b_commands_total", "Total events produced by accepted commands"),
            &["aggregate", "event_type"],
        )?;
        registry.register(Box::new(commands_total.clone()))?;

        let commands_rejected = IntCounterVec::new(
            Opts::new("b2b_commands_rejected_total", "Total commands rejected by business rules"),
            &["aggregate", "reason"],
        )?;
        registry.register(Box::new(commands_rejected.clone()))?;

        // Write Metrics
        let orders_saved = IntCounter::new("b2b_orders_saved_total", "Total order saves")?;
        registry.register(Box::new(orders_saved.clone()))?;

        let shipments_committed = IntCounter::new(
            "b2b_shipments_committed_total",
            "Total shipments committed with all of their lines",
        )?;
        registry.register(Box::new(shipments_committed.clone()))?;

        let shipment_rollbacks = IntCounter::new(
            "b2b_shipment_rollbacks_total",
            "Total shipment headers deleted after a failed line insert",
        )?;
        registry.register(Box::new(shipment_rollbacks.clone()))?;

        // Soft-check Metrics
        let stock_warnings = IntCounter::new(
            "b2b_stock_warnings_total",
            "Total shipment additions that exceeded on-hand stock",
        )?;
        registry.register(Box::new(stock_warnings.clone()))?;

        let over_shipments = IntCounter::new(
            "b2b_over_shipments_total",
            "Total order lines found over-shipped at commit",
        )?;
        registry.register(Box::new(over_shipments.clone()))?;

        // Store Metrics
        let store_duration = HistogramVec::new(
            HistogramOpts::new("b2b_store_duration_seconds", "Store call duration")
                .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
            &["operation"],
        )?;
        registry.register(Box::new(store_duration.clone()))?;

        Ok(Self {
            registry,
            commands_total,
            commands_rejected,
            orders_saved,
            shipments_committed,
            shipment_rollbacks,
            stock_warnings,
            over_shipments,
            store_duration,
        })
    }

    /// Get the Prometheus registry for exposing metrics via HTTP
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Helper to record an accepted command's events
    pub fn record_event(&self, aggregate: &str, event_type: &str) {
        self.commands_total.with_label_values(&[aggregate, event_type]).inc();
    }

    /// Helper to record a rejected command
    pub fn record_rejection(&self, aggregate: &str, reason: &str) {
        self.commands_rejected.with_label_values(&[aggregate, reason]).inc();
    }

    /// Timer that observes the store call duration when dropped
    pub fn store_timer(&self, operation: &str) -> HistogramTimer {
        self.store_duration.with_label_values(&[operation]).start_timer()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter_value(metrics: &Metrics, name: &str) -> Option<f64> {
        metrics
            .registry
            .gather()
            .iter()
            .find(|m| m.name() == name)
            .map(|m| m.metric[0].counter.value.unwrap_or_default())
    }

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();
        assert!(!metrics.registry.gather().is_empty());
    }

    #[test]
    fn test_record_event() {
        let metrics = Metrics::new().unwrap();
        metrics.record_event("order", "OrderLineAdded");
        metrics.record_event("order", "OrderLineAdded");

        assert_eq!(counter_value(&metrics, "b2b_commands_total"), Some(2.0));
    }

    #[test]
    fn test_record_rejection_by_reason() {
        let metrics = Metrics::new().unwrap();
        metrics.record_rejection("shipment", "warehouse_required");
        metrics.record_rejection("shipment", "no_lines");

        let gathered = metrics.registry.gather();
        let rejected = gathered
            .iter()
            .find(|m| m.name() == "b2b_commands_rejected_total")
            .unwrap();
        assert_eq!(rejected.metric.len(), 2);
    }

    #[test]
    fn test_rollback_counter() {
        let metrics = Metrics::new().unwrap();
        metrics.shipment_rollbacks.inc();
        assert_eq!(counter_value(&metrics, "b2b_shipment_rollbacks_total"), Some(1.0));
    }

    #[test]
    fn test_store_timer_observes_on_drop() {
        let metrics = Metrics::new().unwrap();
        {
            let _timer = metrics.store_timer("save_order");
        }
        let gathered = metrics.registry.gather();
        let duration = gathered
            .iter()
            .find(|m| m.name() == "b2b_store_duration_seconds")
            .unwrap();
        assert_eq!(duration.metric[0].histogram.sample_count, Some(1));
    }
}
