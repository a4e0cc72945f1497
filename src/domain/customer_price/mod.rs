// ============================================================================
// Customer Price Domain - Negotiated prices per (customer, parent SKU)
// ============================================================================

pub mod command_handler;
pub mod errors;
pub mod import;
pub mod value_objects;

// Re-export for convenience
pub use command_handler::*;
pub use errors::*;
pub use import::{parse_csv, plan_import, render_csv, PriceRow, RowPlan};
pub use value_objects::*;
