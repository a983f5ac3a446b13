//! # Batch Lifecycle Controller
//!
//! Owns the live state of every non-terminal batch and applies the
//! lifecycle state machine to it: `queued → running` on first dequeue,
//! terminal transitions when all items are accounted for, cooperative
//! cancellation, and system-failure demotion so a batch can never sit in
//! `running` forever after its infrastructure died.
//!
//! Each active batch carries one async mutex over its run state; every
//! mutation of a batch's counters, log, and status goes through that
//! mutex, so writers are serialized per batch while different batches
//! proceed independently. Entries are created at submission and reclaimed
//! on the terminal transition to bound memory.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use dashmap::DashMap;
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::BatchCoreConfig;
use crate::constants::events;
use crate::error::{BatchCoreError, Result};
use crate::events::EventPublisher;
use crate::logging::{log_batch_operation, log_error};
use crate::models::{BatchConfiguration, BatchJob};
use crate::orchestration::eta_estimator::EtaEstimator;
use crate::orchestration::types::FinalizationResult;
use crate::orchestration::work_item_queue::WorkItemQueue;
use crate::state_machine::{BatchEvent, BatchState, BatchStateMachine};
use crate::store::BatchStore;

/// Mutable run state of one live batch, guarded by the batch's mutex.
#[derive(Debug)]
pub struct BatchRunState {
    pub job: BatchJob,
    /// Item indexes already counted as succeeded (idempotence guard)
    pub completed_indexes: HashSet<u32>,
    /// Item indexes already counted as terminally failed
    pub failed_indexes: HashSet<u32>,
    last_snapshot_at: Option<Instant>,
}

/// One live batch: immutable execution parameters plus the serialized
/// mutable run state.
#[derive(Debug)]
pub struct ActiveBatch {
    pub id: Uuid,
    pub analysis_type: String,
    pub configuration: BatchConfiguration,
    pub priority: i32,
    started: AtomicBool,
    cancelled: AtomicBool,
    pub state: Mutex<BatchRunState>,
}

impl ActiveBatch {
    fn new(job: BatchJob) -> Self {
        Self {
            id: job.id,
            analysis_type: job.analysis_type.clone(),
            configuration: job.configuration,
            priority: job.priority,
            started: AtomicBool::new(false),
            cancelled: AtomicBool::new(false),
            state: Mutex::new(BatchRunState {
                job,
                completed_indexes: HashSet::new(),
                failed_indexes: HashSet::new(),
                last_snapshot_at: None,
            }),
        }
    }

    /// Cooperative cancellation token, checked by workers before using a
    /// dequeued item and before reporting an outcome.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

pub struct BatchLifecycleController {
    config: BatchCoreConfig,
    store: Arc<dyn BatchStore>,
    queue: Arc<WorkItemQueue>,
    publisher: EventPublisher,
    estimator: EtaEstimator,
    active: DashMap<Uuid, Arc<ActiveBatch>>,
}

impl BatchLifecycleController {
    pub fn new(
        config: BatchCoreConfig,
        store: Arc<dyn BatchStore>,
        queue: Arc<WorkItemQueue>,
        publisher: EventPublisher,
    ) -> Self {
        Self {
            config,
            store,
            queue,
            publisher,
            estimator: EtaEstimator::new(),
            active: DashMap::new(),
        }
    }

    /// Track a freshly created batch. The caller has already persisted
    /// the `queued` snapshot.
    pub fn register(&self, job: BatchJob) -> Arc<ActiveBatch> {
        let batch = Arc::new(ActiveBatch::new(job));
        self.active.insert(batch.id, batch.clone());
        batch
    }

    pub fn active_batch(&self, id: Uuid) -> Option<Arc<ActiveBatch>> {
        self.active.get(&id).map(|entry| entry.value().clone())
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Live snapshot of a tracked batch, if any.
    pub async fn snapshot(&self, id: Uuid) -> Option<BatchJob> {
        let batch = self.active_batch(id)?;
        let state = batch.state.lock().await;
        Some(state.job.clone())
    }

    /// Transition `queued → running` on the first item dequeue. Called by
    /// every worker; only the first call does any work.
    pub async fn mark_running(&self, batch: &ActiveBatch) {
        if batch.started.swap(true, Ordering::AcqRel) {
            return;
        }

        let mut state = batch.state.lock().await;
        if state.job.status != BatchState::Queued {
            return;
        }
        match BatchStateMachine::determine_target_state(state.job.status, &BatchEvent::Start) {
            Ok(target) => {
                state.job.status = target;
                state.job.started_at = Some(Utc::now());
                self.publisher
                    .publish(events::BATCH_STARTED, batch.id, json!({}));
                log_batch_operation(
                    "start",
                    batch.id,
                    Some(state.job.job_name.as_str()),
                    "running",
                    None,
                );
            }
            Err(e) => {
                log_error("batch_controller", "mark_running", &e.to_string(), None);
            }
        }
    }

    /// Recompute ETA and persist a throttled observability snapshot.
    /// Caller holds the batch mutex.
    pub async fn on_progress_locked(&self, state: &mut BatchRunState) {
        if let Some(started_at) = state.job.started_at {
            state.job.estimated_completion_time = self.estimator.estimate(
                started_at,
                Utc::now(),
                state.job.total_items,
                state.job.accounted_items(),
            );
        }

        let due = state.last_snapshot_at.map_or(true, |at| {
            at.elapsed().as_millis() as u64 >= self.config.running_snapshot_interval_ms
        });
        if due {
            if let Err(e) = self.store.save(&state.job).await {
                warn!(batch_id = %state.job.id, error = %e, "Running snapshot save failed");
            }
            state.last_snapshot_at = Some(Instant::now());
        }
    }

    /// Apply the terminal item-count transition. Caller holds the batch
    /// mutex and has verified all items are accounted for.
    ///
    /// The in-memory status flip, the store flush, and the lifecycle
    /// event all happen before the mutex is released, so external
    /// observers see exactly one terminal notification per batch.
    pub async fn finalize_locked(
        &self,
        batch: &ActiveBatch,
        state: &mut BatchRunState,
    ) -> Result<FinalizationResult> {
        let (event, event_name) = if state.job.failed_items == 0 {
            (BatchEvent::Complete, events::BATCH_COMPLETED)
        } else {
            (
                BatchEvent::Fail(format!(
                    "{} of {} items failed",
                    state.job.failed_items, state.job.total_items
                )),
                events::BATCH_FAILED,
            )
        };

        let target = BatchStateMachine::determine_target_state(state.job.status, &event)
            .map_err(|e| BatchCoreError::StateTransitionError(e.to_string()))?;

        state.job.status = target;
        state.job.completed_at = Some(Utc::now());
        state.job.estimated_completion_time = None;

        if let Err(e) = self.store.save(&state.job).await {
            // The batch is terminal in memory regardless; observers polling
            // the store may lag until the next successful flush
            log_error("batch_controller", "terminal_flush", &e.to_string(), None);
        }

        self.publisher.publish(
            event_name,
            batch.id,
            json!({
                "completedItems": state.job.completed_items,
                "failedItems": state.job.failed_items,
                "totalItems": state.job.total_items,
            }),
        );
        log_batch_operation(
            "finalize",
            batch.id,
            Some(state.job.job_name.as_str()),
            &target.to_string(),
            None,
        );

        self.active.remove(&batch.id);
        self.queue.forget_batch(batch.id);

        Ok(FinalizationResult {
            batch_id: batch.id,
            final_state: target,
            completed_items: state.job.completed_items,
            failed_items: state.job.failed_items,
            total_items: state.job.total_items,
        })
    }

    /// Cancel a batch: stop dequeues immediately, let in-flight items
    /// finish their agent calls unreported, freeze the counts, and flush
    /// the terminal snapshot. Returns the final snapshot as the ack.
    pub async fn cancel_batch(&self, id: Uuid) -> Result<BatchJob> {
        let Some(batch) = self.active_batch(id) else {
            return self.cancel_inactive(id).await;
        };

        // Flag first so workers stop using and reporting items, then purge
        // the queue; both precede the status flip
        batch.cancelled.store(true, Ordering::Release);
        let removed = self.queue.cancel_batch(id);

        let mut state = batch.state.lock().await;
        if state.job.is_terminal() {
            // Lost the race against finalization; the terminal outcome wins
            return Ok(state.job.clone());
        }

        let target = BatchStateMachine::determine_target_state(state.job.status, &BatchEvent::Cancel)
            .map_err(|e| BatchCoreError::StateTransitionError(e.to_string()))?;
        state.job.status = target;
        state.job.completed_at = Some(Utc::now());
        state.job.estimated_completion_time = None;

        if let Err(e) = self.store.save(&state.job).await {
            log_error("batch_controller", "cancel_flush", &e.to_string(), None);
        }

        self.publisher.publish(
            events::BATCH_CANCELLED,
            id,
            json!({
                "completedItems": state.job.completed_items,
                "failedItems": state.job.failed_items,
                "removedPendingItems": removed,
            }),
        );
        log_batch_operation(
            "cancel",
            id,
            Some(state.job.job_name.as_str()),
            "cancelled",
            Some(format!("{removed} pending items removed").as_str()),
        );

        let snapshot = state.job.clone();
        drop(state);
        self.active.remove(&id);
        Ok(snapshot)
    }

    /// Cancel path for a batch this process is not executing: idempotent
    /// ack for terminal records, recovery transition for orphaned live
    /// records (for example after a crash-restart).
    async fn cancel_inactive(&self, id: Uuid) -> Result<BatchJob> {
        let loaded = self
            .store
            .load(id)
            .await
            .map_err(|e| BatchCoreError::StoreError(e.to_string()))?;
        let Some(mut job) = loaded else {
            return Err(BatchCoreError::BatchNotFound(id));
        };

        if job.is_terminal() {
            return Ok(job);
        }

        let target = BatchStateMachine::determine_target_state(job.status, &BatchEvent::Cancel)
            .map_err(|e| BatchCoreError::StateTransitionError(e.to_string()))?;
        job.status = target;
        job.completed_at = Some(Utc::now());
        job.estimated_completion_time = None;
        self.store
            .save(&job)
            .await
            .map_err(|e| BatchCoreError::StoreError(e.to_string()))?;
        self.publisher
            .publish(events::BATCH_CANCELLED, id, json!({"recovered": true}));
        Ok(job)
    }

    /// Mark a batch failed because its infrastructure failed (queue or
    /// store), with a synthetic batch-level error log entry. Without this
    /// a batch whose machinery died would sit in `running` indefinitely.
    pub async fn fail_batch_for_system_error(&self, id: Uuid, message: String) {
        let Some(batch) = self.active_batch(id) else {
            debug!(batch_id = %id, "System failure for untracked batch ignored");
            return;
        };

        batch.cancelled.store(true, Ordering::Release);
        self.queue.cancel_batch(id);

        let mut state = batch.state.lock().await;
        if state.job.is_terminal() {
            return;
        }

        state.job.record_system_error(message.clone());
        match BatchStateMachine::determine_target_state(
            state.job.status,
            &BatchEvent::Fail(message.clone()),
        ) {
            Ok(target) => {
                state.job.status = target;
            }
            Err(e) => {
                log_error("batch_controller", "system_failure", &e.to_string(), None);
                return;
            }
        }
        state.job.completed_at = Some(Utc::now());
        state.job.estimated_completion_time = None;

        if let Err(e) = self.store.save(&state.job).await {
            log_error("batch_controller", "system_failure_flush", &e.to_string(), None);
        }

        log_batch_operation(
            "system_failure",
            id,
            Some(state.job.job_name.as_str()),
            "failed",
            Some(message.as_str()),
        );
        self.publisher
            .publish(events::BATCH_FAILED, id, json!({"systemError": message}));

        drop(state);
        self.active.remove(&id);
    }
}
