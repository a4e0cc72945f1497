use uuid::Uuid;

// ============================================================================
// Customer Price Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum PriceError {
    #[error("Parent SKU cannot be empty")]
    EmptyParentSku,

    #[error("Unit price must be a number from 0 to 1000000000000000: {0}")]
    InvalidPrice(String),

    #[error("Customer not found: {0}")]
    CustomerNotFound(Uuid),

    #[error("Deleting a price must be confirmed")]
    DeleteNotConfirmed,

    #[error("CSV file is empty or has no data rows")]
    EmptyCsv,

    #[error("CSV header is missing column {0}")]
    MissingColumn(&'static str),

    #[error("CSV file could not be read: {0}")]
    MalformedCsv(String),
}
