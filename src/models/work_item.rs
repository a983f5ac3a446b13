use serde_json::Value;
use uuid::Uuid;

/// One unit of analysis work within a batch.
///
/// In-memory only, never persisted individually. Exclusively owned by the
/// queue until dequeued, then by the worker that holds it until its
/// outcome is reported; ownership is never shared.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkItem {
    pub batch_id: Uuid,
    /// Position of this item in the batch's submitted item list
    pub index: u32,
    pub payload: Value,
    /// Number of attempts already made; 0 for a fresh item
    pub attempt_count: u32,
}

impl WorkItem {
    pub fn new(batch_id: Uuid, index: u32, payload: Value) -> Self {
        Self {
            batch_id,
            index,
            payload,
            attempt_count: 0,
        }
    }

    /// Consume this item into its retry successor.
    pub fn next_attempt(mut self) -> Self {
        self.attempt_count += 1;
        self
    }
}
