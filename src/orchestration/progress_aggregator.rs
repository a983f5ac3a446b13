//! # Progress Aggregator
//!
//! Authoritative accumulator for per-batch completion state. Workers
//! report each item's outcome here exactly once from the batch's point of
//! view: reports are idempotent per `(batch, index)`, so a retry and a
//! late original response resolving the same item can never double-count.
//!
//! Every accepted report recomputes derived progress and the ETA, and the
//! report that accounts for the final item triggers the controller's
//! terminal transition while the batch's writer lock is still held.

use std::sync::Arc;

use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use crate::constants::events;
use crate::error::Result;
use crate::events::EventPublisher;
use crate::models::AnalysisResult;
use crate::orchestration::batch_controller::BatchLifecycleController;
use crate::orchestration::types::FinalizationResult;

pub struct ProgressAggregator {
    controller: Arc<BatchLifecycleController>,
    publisher: EventPublisher,
}

impl ProgressAggregator {
    pub fn new(controller: Arc<BatchLifecycleController>, publisher: EventPublisher) -> Self {
        Self {
            controller,
            publisher,
        }
    }

    /// Record one item's success. Returns the finalization outcome when
    /// this report accounted for the batch's last item.
    pub async fn report_success(
        &self,
        batch_id: Uuid,
        index: u32,
        result: AnalysisResult,
    ) -> Result<Option<FinalizationResult>> {
        let Some(batch) = self.controller.active_batch(batch_id) else {
            debug!(batch_id = %batch_id, index, "Success report for inactive batch dropped");
            return Ok(None);
        };

        let mut state = batch.state.lock().await;
        if state.job.is_terminal() {
            return Ok(None);
        }
        if state.completed_indexes.contains(&index) || state.failed_indexes.contains(&index) {
            debug!(batch_id = %batch_id, index, "Duplicate success report ignored");
            return Ok(None);
        }

        state.completed_indexes.insert(index);
        state.job.record_success(index, result);
        self.publisher.publish(
            events::ITEM_COMPLETED,
            batch_id,
            json!({
                "itemIndex": index,
                "progress": state.job.progress,
            }),
        );

        if state.job.all_items_accounted() {
            let finalization = self.controller.finalize_locked(&batch, &mut state).await?;
            return Ok(Some(finalization));
        }

        self.controller.on_progress_locked(&mut state).await;
        Ok(None)
    }

    /// Record one item's terminal failure (retries already exhausted or
    /// the error was not retryable).
    pub async fn report_failure(
        &self,
        batch_id: Uuid,
        index: u32,
        error_message: String,
    ) -> Result<Option<FinalizationResult>> {
        let Some(batch) = self.controller.active_batch(batch_id) else {
            debug!(batch_id = %batch_id, index, "Failure report for inactive batch dropped");
            return Ok(None);
        };

        let mut state = batch.state.lock().await;
        if state.job.is_terminal() {
            return Ok(None);
        }
        if state.completed_indexes.contains(&index) || state.failed_indexes.contains(&index) {
            debug!(batch_id = %batch_id, index, "Duplicate failure report ignored");
            return Ok(None);
        }

        state.failed_indexes.insert(index);
        state.job.record_failure(index, error_message.clone());
        self.publisher.publish(
            events::ITEM_FAILED,
            batch_id,
            json!({
                "itemIndex": index,
                "error": error_message,
                "progress": state.job.progress,
            }),
        );

        if state.job.all_items_accounted() {
            let finalization = self.controller.finalize_locked(&batch, &mut state).await?;
            return Ok(Some(finalization));
        }

        self.controller.on_progress_locked(&mut state).await;
        Ok(None)
    }
}
