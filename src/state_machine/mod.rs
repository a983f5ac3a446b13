// State machine module for batch lifecycle management
//
// Provides the batch state enum, the events that move it, and a pure
// transition table; the lifecycle controller applies the transitions to
// live batch records.

pub mod batch_state_machine;
pub mod errors;
pub mod events;
pub mod states;

// Re-export main types for convenient access
pub use batch_state_machine::BatchStateMachine;
pub use errors::{StateMachineError, StateMachineResult};
pub use events::BatchEvent;
pub use states::BatchState;
