// ============================================================================
// Order Domain - B2B quote/order aggregate
// ============================================================================
//
// This module contains ALL Order-specific code:
// - Value objects (OrderLine, OrderStatus, PaymentStatus, totals)
// - Pricing math and lenient form-input coercion
// - Status state machine with its guards
// - Events, Commands, Errors
// - Aggregate (OrderAggregate reducer)
// - Command Handler (OrderCommandHandler)
//
// ============================================================================

pub mod aggregate;
pub mod command_handler;
pub mod commands;
pub mod errors;
pub mod events;
pub mod pricing;
pub mod status;
pub mod value_objects;

// Re-export for convenience
pub use aggregate::*;
pub use command_handler::*;
pub use commands::*;
pub use errors::*;
pub use events::*;
pub use pricing::*;
pub use status::*;
pub use value_objects::*;
