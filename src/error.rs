use std::fmt;

use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub enum BatchCoreError {
    ValidationError(String),
    StateTransitionError(String),
    OrchestrationError(String),
    StoreError(String),
    EventError(String),
    ConfigurationError(String),
    BatchNotFound(Uuid),
}

impl fmt::Display for BatchCoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchCoreError::ValidationError(msg) => write!(f, "Validation error: {msg}"),
            BatchCoreError::StateTransitionError(msg) => {
                write!(f, "State transition error: {msg}")
            }
            BatchCoreError::OrchestrationError(msg) => write!(f, "Orchestration error: {msg}"),
            BatchCoreError::StoreError(msg) => write!(f, "Store error: {msg}"),
            BatchCoreError::EventError(msg) => write!(f, "Event error: {msg}"),
            BatchCoreError::ConfigurationError(msg) => write!(f, "Configuration error: {msg}"),
            BatchCoreError::BatchNotFound(id) => write!(f, "Batch not found: {id}"),
        }
    }
}

impl std::error::Error for BatchCoreError {}

pub type Result<T> = std::result::Result<T, BatchCoreError>;
