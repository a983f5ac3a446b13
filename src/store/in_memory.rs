use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

use super::{BatchStore, StoreError};
use crate::models::BatchJob;

/// Reference store backed by a concurrent map.
///
/// Suitable for tests and for embedding the orchestrator without an
/// external database; production deployments wire their own adapter.
///
/// # Examples
///
/// ```rust
/// use patanalyse_core::config::BatchCoreConfig;
/// use patanalyse_core::models::{BatchConfiguration, BatchJob};
/// use patanalyse_core::store::{BatchStore, InMemoryBatchStore};
/// use serde_json::json;
///
/// # tokio_test::block_on(async {
/// let store = InMemoryBatchStore::new();
/// let job = BatchJob::new(
///     "user-1".to_string(),
///     None,
///     "sweep".to_string(),
///     "patent_analysis".to_string(),
///     "prior_art".to_string(),
///     vec![json!({"patentNumber": "US1234567"})],
///     1,
///     BatchConfiguration::defaults_from(&BatchCoreConfig::default()),
/// );
/// store.create(&job).await.unwrap();
/// assert!(store.load(job.id).await.unwrap().is_some());
/// # });
/// ```
#[derive(Debug, Default)]
pub struct InMemoryBatchStore {
    records: DashMap<Uuid, BatchJob>,
}

impl InMemoryBatchStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl BatchStore for InMemoryBatchStore {
    async fn create(&self, job: &BatchJob) -> Result<(), StoreError> {
        if self.records.contains_key(&job.id) {
            return Err(StoreError::AlreadyExists { id: job.id });
        }
        self.records.insert(job.id, job.clone());
        Ok(())
    }

    async fn load(&self, id: Uuid) -> Result<Option<BatchJob>, StoreError> {
        Ok(self.records.get(&id).map(|entry| entry.value().clone()))
    }

    async fn save(&self, job: &BatchJob) -> Result<(), StoreError> {
        self.records.insert(job.id, job.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BatchCoreConfig;
    use crate::models::BatchConfiguration;
    use crate::state_machine::BatchState;
    use serde_json::json;

    fn sample_job() -> BatchJob {
        BatchJob::new(
            "user-1".to_string(),
            Some("project-9".to_string()),
            "novelty screen".to_string(),
            "patent_analysis".to_string(),
            "novelty".to_string(),
            vec![json!({"patentNumber": "US123"})],
            1,
            BatchConfiguration::defaults_from(&BatchCoreConfig::default()),
        )
    }

    #[tokio::test]
    async fn test_create_load_save_roundtrip() {
        let store = InMemoryBatchStore::new();
        let mut job = sample_job();

        store.create(&job).await.unwrap();
        assert!(store.load(job.id).await.unwrap().is_some());

        job.status = BatchState::Running;
        store.save(&job).await.unwrap();
        let loaded = store.load(job.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, BatchState::Running);
    }

    #[tokio::test]
    async fn test_duplicate_create_rejected() {
        let store = InMemoryBatchStore::new();
        let job = sample_job();

        store.create(&job).await.unwrap();
        assert!(matches!(
            store.create(&job).await,
            Err(StoreError::AlreadyExists { .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_batch_is_none() {
        let store = InMemoryBatchStore::new();
        assert!(store.load(Uuid::new_v4()).await.unwrap().is_none());
    }
}
