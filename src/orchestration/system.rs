//! # Batch Orchestration System
//!
//! Wires the queue, controller, aggregator, and executor pool into one
//! unit and exposes the submission API an HTTP layer calls:
//! `submit_batch`, `get_batch`, `cancel_batch`.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use patanalyse_core::config::BatchCoreConfig;
//! use patanalyse_core::orchestration::{BatchOrchestrationSystem, BatchSubmission};
//! use patanalyse_core::store::InMemoryBatchStore;
//! # use std::time::Duration;
//! # use async_trait::async_trait;
//! # use serde_json::{json, Value};
//! # use patanalyse_core::agent::{AgentError, AnalysisAgent};
//! # use patanalyse_core::models::AnalysisResult;
//! # struct MyAgent;
//! # #[async_trait]
//! # impl AnalysisAgent for MyAgent {
//! #     fn supports(&self, _t: &str) -> bool { true }
//! #     async fn invoke(&self, _t: &str, p: &Value, _d: Duration)
//! #         -> Result<AnalysisResult, AgentError> { Ok(AnalysisResult::new(p.clone())) }
//! # }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let system = BatchOrchestrationSystem::new(
//!     BatchCoreConfig::default(),
//!     Arc::new(MyAgent),
//!     Arc::new(InMemoryBatchStore::new()),
//! );
//! system.start();
//!
//! let submission = BatchSubmission::new(
//!     "user-42",
//!     "portfolio sweep",
//!     "patent_analysis",
//!     "prior_art",
//!     vec![json!({"patentNumber": "US1234567"})],
//! );
//! let batch_id = system.submit_batch(submission).await?;
//! let snapshot = system.get_batch(batch_id).await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use serde_json::json;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::agent::AnalysisAgent;
use crate::config::BatchCoreConfig;
use crate::constants::events;
use crate::error::{BatchCoreError, Result};
use crate::events::{EventPublisher, OrchestrationEvent};
use crate::logging::log_batch_operation;
use crate::models::{BatchJob, WorkItem};
use crate::orchestration::batch_controller::BatchLifecycleController;
use crate::orchestration::executor_pool::ExecutorPool;
use crate::orchestration::progress_aggregator::ProgressAggregator;
use crate::orchestration::types::BatchSubmission;
use crate::orchestration::work_item_queue::WorkItemQueue;
use crate::validation::validate_submission;
use crate::store::BatchStore;

pub struct BatchOrchestrationSystem {
    config: BatchCoreConfig,
    agent: Arc<dyn AnalysisAgent>,
    store: Arc<dyn BatchStore>,
    queue: Arc<WorkItemQueue>,
    publisher: EventPublisher,
    controller: Arc<BatchLifecycleController>,
    pool: ExecutorPool,
}

impl BatchOrchestrationSystem {
    /// Wire all components. Workers do not run until `start`.
    pub fn new(
        config: BatchCoreConfig,
        agent: Arc<dyn AnalysisAgent>,
        store: Arc<dyn BatchStore>,
    ) -> Self {
        let queue = Arc::new(WorkItemQueue::new());
        let publisher = EventPublisher::new(config.event_channel_capacity);
        let controller = Arc::new(BatchLifecycleController::new(
            config.clone(),
            store.clone(),
            queue.clone(),
            publisher.clone(),
        ));
        let aggregator = Arc::new(ProgressAggregator::new(
            controller.clone(),
            publisher.clone(),
        ));
        let pool = ExecutorPool::new(
            &config,
            queue.clone(),
            agent.clone(),
            aggregator,
            controller.clone(),
            publisher.clone(),
        );

        Self {
            config,
            agent,
            store,
            queue,
            publisher,
            controller,
            pool,
        }
    }

    /// Spawn the executor pool workers.
    pub fn start(&self) {
        self.pool.start();
    }

    /// Validate and admit a batch: persist the `queued` record, register
    /// it with the controller, and enqueue every item atomically.
    ///
    /// A rejected submission creates nothing - no record, no queue
    /// entries. A queue admission failure after the record was created is
    /// a system failure: the batch is marked `failed` rather than left
    /// `queued` forever.
    pub async fn submit_batch(&self, submission: BatchSubmission) -> Result<Uuid> {
        validate_submission(&submission, self.agent.as_ref())?;

        let configuration = submission
            .configuration
            .clone()
            .unwrap_or_default()
            .resolve(&self.config);
        let job = BatchJob::new(
            submission.owner_id,
            submission.project_id,
            submission.job_name,
            submission.job_type,
            submission.analysis_type,
            submission.items,
            submission.priority,
            configuration,
        );
        let batch_id = job.id;
        let job_name = job.job_name.clone();
        let total_items = job.total_items;
        let priority = job.priority;

        self.store
            .create(&job)
            .await
            .map_err(|e| BatchCoreError::StoreError(e.to_string()))?;

        let items: Vec<WorkItem> = job
            .items
            .iter()
            .enumerate()
            .map(|(index, payload)| WorkItem::new(batch_id, index as u32, payload.clone()))
            .collect();

        self.controller.register(job);

        // Published before the items hit the queue so observers always see
        // batch.submitted ahead of any worker-driven event
        self.publisher.publish(
            events::BATCH_SUBMITTED,
            batch_id,
            json!({
                "totalItems": total_items,
                "priority": priority,
            }),
        );

        if let Err(e) =
            self.queue
                .enqueue_batch(batch_id, items, priority, configuration.concurrency_limit)
        {
            self.controller
                .fail_batch_for_system_error(batch_id, format!("queue admission failed: {e}"))
                .await;
            return Err(BatchCoreError::OrchestrationError(format!(
                "failed to enqueue batch {batch_id}: {e}"
            )));
        }

        log_batch_operation("submit", batch_id, Some(job_name.as_str()), "queued", None);

        Ok(batch_id)
    }

    /// Current snapshot of a batch: the live record while it runs, the
    /// stored record once terminal. `Ok(None)` when the id is unknown.
    pub async fn get_batch(&self, id: Uuid) -> Result<Option<BatchJob>> {
        if let Some(snapshot) = self.controller.snapshot(id).await {
            return Ok(Some(snapshot));
        }
        self.store
            .load(id)
            .await
            .map_err(|e| BatchCoreError::StoreError(e.to_string()))
    }

    /// Cancel a batch. In-flight agent calls finish cooperatively but no
    /// further items of this batch are dequeued or counted. Returns the
    /// terminal snapshot as the ack.
    pub async fn cancel_batch(&self, id: Uuid) -> Result<BatchJob> {
        self.controller.cancel_batch(id).await
    }

    /// Subscribe to lifecycle events.
    pub fn subscribe_events(&self) -> broadcast::Receiver<OrchestrationEvent> {
        self.publisher.subscribe()
    }

    pub fn config(&self) -> &BatchCoreConfig {
        &self.config
    }

    /// Stop accepting work and wait for workers to drain.
    pub async fn shutdown(&self) {
        self.pool.shutdown().await;
    }
}
