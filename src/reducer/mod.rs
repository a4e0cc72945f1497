// ============================================================================
// Reducer Core - Generic Draft Abstractions
// ============================================================================
//
// Orders and shipment drafts are plain serializable values. Every operator
// edit is a command; a command is validated into events, and events are the
// only thing that mutates the value. Persistence happens only at explicit
// save boundaries in the command handlers.
//
// ============================================================================

pub mod aggregate;
pub mod event;

pub use aggregate::Aggregate;
pub use event::DomainEvent;
