use serde::Serialize;

use crate::domain::customer_price::PriceError;
use crate::domain::order::OrderError;
use crate::domain::shipment::ShipmentError;
use crate::store::StoreError;

// ============================================================================
// Action Outcome
// ============================================================================
//
// Every user-facing operation ends in an ActionResult. Domain rejections keep
// their own wording; duplicate keys read "already registered"; anything else
// surfaces the raw error text.
//
// ============================================================================

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ActionResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ActionResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: None,
            error: Some(error.into()),
        }
    }

    pub fn from_error(error: &anyhow::Error) -> Self {
        Self::failed(user_message(error))
    }

    /// Fold an operation result into an outcome, logging failures
    pub fn from_result<T>(result: &anyhow::Result<T>, success_message: impl Into<String>) -> Self {
        match result {
            Ok(_) => Self::ok(success_message),
            Err(e) => {
                tracing::warn!(error = %e, "Action failed");
                Self::from_error(e)
            }
        }
    }
}

fn user_message(error: &anyhow::Error) -> String {
    for cause in error.chain() {
        if let Some(store) = cause.downcast_ref::<StoreError>() {
            match store {
                StoreError::UniqueViolation { .. } => return "already registered".to_string(),
                StoreError::NotFound { .. } => return store.to_string(),
                _ => {}
            }
        }
        if let Some(e) = cause.downcast_ref::<OrderError>() {
            return e.to_string();
        }
        if let Some(e) = cause.downcast_ref::<ShipmentError>() {
            return e.to_string();
        }
        if let Some(e) = cause.downcast_ref::<PriceError>() {
            return e.to_string();
        }
    }
    error.to_string()
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_ok_carries_message() {
        let result = ActionResult::ok("Order saved");
        assert!(result.success);
        assert_eq!(result.message.as_deref(), Some("Order saved"));
        assert!(result.error.is_none());
    }

    #[test]
    fn test_unique_violation_reads_already_registered() {
        let err = anyhow::Error::new(StoreError::UniqueViolation {
            constraint: "b2b_customer_prices_customer_id_parent_sku_key".into(),
        })
        .context("Failed to add price");

        let result = ActionResult::from_error(&err);
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("already registered"));
    }

    #[test]
    fn test_domain_error_wins_over_context() {
        let err: anyhow::Result<()> = Err(ShipmentError::WarehouseRequired)
            .context("Failed to commit shipment");
        let err = err.unwrap_err();

        let result = ActionResult::from_error(&err);
        assert_eq!(
            result.error.as_deref(),
            Some("Select a warehouse before saving the shipment")
        );
    }

    #[test]
    fn test_other_errors_use_raw_message() {
        let err = anyhow::anyhow!("connection reset");
        let result = ActionResult::from_error(&err);
        assert_eq!(result.error.as_deref(), Some("connection reset"));
    }

    #[test]
    fn test_from_result() {
        let ok: anyhow::Result<u32> = Ok(1);
        assert!(ActionResult::from_result(&ok, "done").success);

        let failed: anyhow::Result<u32> = Err(OrderError::CustomerRequired.into());
        let result = ActionResult::from_result(&failed, "done");
        assert!(!result.success);
        assert_eq!(
            result.error.as_deref(),
            Some("Select a customer before saving the order")
        );
    }

    #[test]
    fn test_serializes_without_empty_fields() {
        let json = serde_json::to_value(ActionResult::ok("saved")).unwrap();
        assert_eq!(json, serde_json::json!({"success": true, "message": "saved"}));
    }
}
