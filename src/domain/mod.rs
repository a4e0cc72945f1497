// ============================================================================
// Domain Layer - Business Logic
// ============================================================================
//
// Each aggregate has its own subdirectory with:
// - Value objects
// - Events
// - Commands
// - Errors
// - Aggregate implementation
// - Command handler
//
// Nothing here knows which store backs it; handlers talk to `B2bStore`.
//
// ============================================================================

pub mod customer_price;
pub mod numbering;
pub mod order;
pub mod shipment;
