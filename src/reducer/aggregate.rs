// ============================================================================
// Aggregate Pattern - Pure Reducer Core
// ============================================================================
//
// Key Principles:
// 1. Commands are validated before any event is emitted
// 2. Events describe a change that has already been accepted
// 3. apply_event never fails; all rejection happens in handle_command
// 4. Derived fields (totals, stock checks) are recomputed inside apply_event
//
// ============================================================================

/// Generic Aggregate trait - every draft value object implements this
///
/// Type Parameters:
/// - `Event`: The accepted change type for this aggregate
/// - `Command`: The operator intent type for this aggregate
/// - `Error`: The error type for business rule violations
pub trait Aggregate: Sized + Send + Sync {
    type Event;
    type Command;
    type Error;

    /// Validate a command against current state and emit events
    fn handle_command(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error>;

    /// Apply an accepted event to update state
    fn apply_event(&mut self, event: &Self::Event);

    /// Handle a command and immediately fold its events into `self`
    fn execute(&mut self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        let events = self.handle_command(command)?;
        for event in &events {
            self.apply_event(event);
        }
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Counter {
        value: u32,
    }

    enum CounterCommand {
        Add(u32),
    }

    struct Added(u32);

    impl Aggregate for Counter {
        type Event = Added;
        type Command = CounterCommand;
        type Error = String;

        fn handle_command(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
            match command {
                CounterCommand::Add(0) => Ok(vec![]),
                CounterCommand::Add(n) if self.value.checked_add(*n).is_none() => {
                    Err("overflow".to_string())
                }
                CounterCommand::Add(n) => Ok(vec![Added(*n)]),
            }
        }

        fn apply_event(&mut self, event: &Self::Event) {
            self.value += event.0;
        }
    }

    #[test]
    fn test_execute_applies_emitted_events() {
        let mut counter = Counter::default();
        let events = counter.execute(&CounterCommand::Add(3)).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(counter.value, 3);
    }

    #[test]
    fn test_rejected_command_leaves_state_untouched() {
        let mut counter = Counter { value: u32::MAX };
        assert!(counter.execute(&CounterCommand::Add(1)).is_err());
        assert_eq!(counter.value, u32::MAX);
    }

    #[test]
    fn test_command_without_events_is_a_no_op() {
        let mut counter = Counter::default();
        assert!(counter.execute(&CounterCommand::Add(0)).unwrap().is_empty());
        assert_eq!(counter.value, 0);
    }
}
