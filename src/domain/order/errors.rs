use super::value_objects::OrderStatus;

// ============================================================================
// Order Business Rule Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("Order is already cancelled")]
    AlreadyCancelled,

    #[error("Cannot move order from {from} to {to}")]
    InvalidStatusTransition { from: OrderStatus, to: OrderStatus },

    #[error("Order has no line for parent SKU {0}")]
    LineNotFound(String),

    #[error("Parent SKU cannot be empty")]
    EmptyParentSku,

    #[error("Invalid item quantity: {0}")]
    InvalidQuantity(i32),

    #[error("Select a customer before saving the order")]
    CustomerRequired,

    #[error("Order not found: {0}")]
    NotFound(uuid::Uuid),

    #[error("Deleting an order must be confirmed")]
    DeleteNotConfirmed,
}
