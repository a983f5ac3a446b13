//! # System Constants
//!
//! Core constants and event names that define the operational boundaries
//! of the batch orchestration core. Status strings stay compatible with
//! the backend's persisted `batch_jobs` records.

// Re-export state type under the wire-facing name for convenience
pub use crate::state_machine::BatchState as BatchStatus;

/// Lifecycle events published through the `EventPublisher`
pub mod events {
    // Batch lifecycle events
    pub const BATCH_SUBMITTED: &str = "batch.submitted";
    pub const BATCH_STARTED: &str = "batch.started";
    pub const BATCH_COMPLETED: &str = "batch.completed";
    pub const BATCH_FAILED: &str = "batch.failed";
    pub const BATCH_CANCELLED: &str = "batch.cancelled";

    // Item lifecycle events
    pub const ITEM_COMPLETED: &str = "item.completed";
    pub const ITEM_FAILED: &str = "item.failed";
    pub const ITEM_RETRIED: &str = "item.retried";
}

/// Status groupings used for queries and assertions
pub mod status_groups {
    use crate::state_machine::BatchState;

    /// States from which no further transition occurs
    pub const TERMINAL_STATUSES: &[BatchState] = &[
        BatchState::Completed,
        BatchState::Failed,
        BatchState::Cancelled,
    ];

    /// States in which a batch still owns queue or worker resources
    pub const LIVE_STATUSES: &[BatchState] = &[BatchState::Queued, BatchState::Running];
}

/// System-wide defaults
pub mod system {
    /// Default batch priority when a submission does not set one
    pub const DEFAULT_PRIORITY: i32 = 1;

    /// Default capacity of the lifecycle event broadcast channel
    pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 1_024;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_machine::BatchState;

    #[test]
    fn test_status_groups_cover_all_states() {
        let all = [
            BatchState::Queued,
            BatchState::Running,
            BatchState::Completed,
            BatchState::Failed,
            BatchState::Cancelled,
        ];
        for state in all {
            let in_terminal = status_groups::TERMINAL_STATUSES.contains(&state);
            let in_live = status_groups::LIVE_STATUSES.contains(&state);
            assert!(in_terminal ^ in_live, "{state} must be in exactly one group");
            assert_eq!(in_terminal, state.is_terminal());
        }
    }
}
