//! # Batch Store Adapter
//!
//! External persistence collaborator. The core only requires load and
//! save by id; per-batch writer serialization upstream guarantees that
//! every `save` for a given batch carries a snapshot at least as new as
//! the last, so the contract stays an idempotent full overwrite.

pub mod in_memory;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::BatchJob;

pub use in_memory::InMemoryBatchStore;

/// Errors surfaced by a store implementation
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Batch {id} already exists")]
    AlreadyExists { id: Uuid },

    #[error("Store backend error: {0}")]
    Backend(String),

    #[error("Snapshot serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Persistence seam for `BatchJob` snapshots.
///
/// Used at creation, on every terminal transition, and on a throttled
/// cadence for `running` snapshots (observability only).
#[async_trait]
pub trait BatchStore: Send + Sync {
    /// Persist a newly created batch. Fails if the id already exists.
    async fn create(&self, job: &BatchJob) -> Result<(), StoreError>;

    /// Load a snapshot by id; `None` when the batch does not exist.
    async fn load(&self, id: Uuid) -> Result<Option<BatchJob>, StoreError>;

    /// Overwrite the stored snapshot. Idempotent.
    async fn save(&self, job: &BatchJob) -> Result<(), StoreError>;
}
