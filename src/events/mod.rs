//! Event system: broadcast publishing of batch lifecycle events.

pub mod publisher;

pub use publisher::{EventPublisher, OrchestrationEvent};
