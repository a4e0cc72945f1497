// ============================================================================
// Domain Event Trait
// ============================================================================

/// Stable names for accepted changes, used as log fields and metric labels.
pub trait DomainEvent {
    fn event_type(&self) -> &'static str;
}
