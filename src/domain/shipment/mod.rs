// ============================================================================
// Shipment Domain - Order line -> child SKU expansion and fulfillment
// ============================================================================
//
// - Value objects (Shipment, ShipmentLine, ChildSku, stock records)
// - SKU catalog and stock snapshot read at form-open time
// - ShipmentDraft reducer with the merge rule and stock indicators
// - Reconciliation of ordered vs shipped quantities
// - Status lifecycle and its inventory effects
// - Command Handler (ShipmentCommandHandler)
//
// ============================================================================

pub mod catalog;
pub mod command_handler;
pub mod commands;
pub mod draft;
pub mod errors;
pub mod events;
pub mod inventory;
pub mod reconciliation;
pub mod value_objects;

// Re-export for convenience
pub use catalog::*;
pub use command_handler::*;
pub use commands::*;
pub use draft::*;
pub use errors::*;
pub use events::*;
pub use inventory::*;
pub use reconciliation::*;
pub use value_objects::*;
