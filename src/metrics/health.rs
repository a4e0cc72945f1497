use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::store::B2bStore;

/// Store reachability as last observed by `check_store`
pub struct HealthState {
    backend: &'static str,
    store_reachable: AtomicBool,
    /// Unix seconds of the last check, 0 before the first one
    last_checked: AtomicI64,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct HealthReport {
    pub status: &'static str,
    pub service: &'static str,
    pub store: &'static str,
    pub store_reachable: Option<bool>,
    pub last_checked: Option<DateTime<Utc>>,
}

impl HealthState {
    pub fn new(backend: &'static str) -> Self {
        Self {
            backend,
            store_reachable: AtomicBool::new(false),
            last_checked: AtomicI64::new(0),
        }
    }

    pub fn record(&self, reachable: bool, at: DateTime<Utc>) {
        self.store_reachable.store(reachable, Ordering::Relaxed);
        self.last_checked.store(at.timestamp(), Ordering::Relaxed);
    }

    /// `starting` until the first check, then `healthy` or `degraded`
    pub fn report(&self) -> HealthReport {
        let last_checked = match self.last_checked.load(Ordering::Relaxed) {
            0 => None,
            secs => DateTime::from_timestamp(secs, 0),
        };
        let store_reachable = last_checked.map(|_| self.store_reachable.load(Ordering::Relaxed));
        let status = match store_reachable {
            None => "starting",
            Some(true) => "healthy",
            Some(false) => "degraded",
        };
        HealthReport {
            status,
            service: "b2b-fulfillment",
            store: self.backend,
            store_reachable,
            last_checked,
        }
    }
}

/// One cheap read against the store
pub async fn check_store(store: &dyn B2bStore, health: &HealthState) -> bool {
    let reachable = match store.warehouses().await {
        Ok(_) => true,
        Err(e) => {
            tracing::warn!(store = health.backend, error = %e, "Store health check failed");
            false
        }
    };
    health.record(reachable, Utc::now());
    reachable
}

/// Re-check the store every `interval` for as long as the process runs
pub async fn watch_store(store: Arc<dyn B2bStore>, health: Arc<HealthState>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        check_store(store.as_ref(), &health).await;
    }
}
