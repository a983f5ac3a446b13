use thiserror::Error;

/// Errors raised while evaluating or applying batch state transitions
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StateMachineError {
    #[error("Invalid transition from {from} on {event}")]
    InvalidTransition { from: String, event: String },

    #[error("Internal state machine error: {0}")]
    Internal(String),
}

pub type StateMachineResult<T> = Result<T, StateMachineError>;
