use super::{
    errors::{StateMachineError, StateMachineResult},
    events::BatchEvent,
    states::BatchState,
};

/// Pure transition table for the batch lifecycle.
///
/// The controller owns the mutable batch record and its persistence; this
/// type only answers "given the current state and this event, where does
/// the batch go". Keeping it free of I/O makes the legal-transition set
/// exhaustively testable.
pub struct BatchStateMachine;

impl BatchStateMachine {
    /// Determine the target state for an event, or reject the transition.
    pub fn determine_target_state(
        current_state: BatchState,
        event: &BatchEvent,
    ) -> StateMachineResult<BatchState> {
        let target = match (current_state, event) {
            // First dequeue moves the batch out of the holding state
            (BatchState::Queued, BatchEvent::Start) => BatchState::Running,

            // Terminal item-count transitions
            (BatchState::Running, BatchEvent::Complete) => BatchState::Completed,
            (BatchState::Running, BatchEvent::Fail(_)) => BatchState::Failed,

            // A system failure can kill a batch that never started running
            (BatchState::Queued, BatchEvent::Fail(_)) => BatchState::Failed,

            // Cancellation is legal from either non-terminal state
            (BatchState::Queued, BatchEvent::Cancel) => BatchState::Cancelled,
            (BatchState::Running, BatchEvent::Cancel) => BatchState::Cancelled,

            // Everything else, including any event against a terminal state
            (from_state, event) => {
                return Err(StateMachineError::InvalidTransition {
                    from: from_state.to_string(),
                    event: event.event_type().to_string(),
                })
            }
        };

        Ok(target)
    }
}
