//! # Analysis Executor Pool
//!
//! Fixed-size set of workers that pull items off the queue, invoke the
//! external analysis agent with the batch's per-item timeout, and report
//! each outcome to the progress aggregator. Workers are fully
//! independent: one worker's slow agent call never blocks another, and a
//! failing item is retried through a detached delay task rather than by
//! parking the worker that saw it fail.

use std::sync::Arc;
use std::time::Instant;

use serde_json::json;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info};

use crate::agent::AnalysisAgent;
use crate::config::BatchCoreConfig;
use crate::constants::events;
use crate::events::EventPublisher;
use crate::logging::{log_error, log_item_operation};
use crate::models::WorkItem;
use crate::orchestration::backoff_calculator::BackoffCalculator;
use crate::orchestration::batch_controller::{ActiveBatch, BatchLifecycleController};
use crate::orchestration::progress_aggregator::ProgressAggregator;
use crate::orchestration::work_item_queue::WorkItemQueue;

/// Everything a worker needs, cloned into each spawned worker task.
#[derive(Clone)]
struct WorkerContext {
    worker_id: usize,
    queue: Arc<WorkItemQueue>,
    agent: Arc<dyn AnalysisAgent>,
    aggregator: Arc<ProgressAggregator>,
    controller: Arc<BatchLifecycleController>,
    publisher: EventPublisher,
    backoff: BackoffCalculator,
}

pub struct ExecutorPool {
    worker_count: usize,
    queue: Arc<WorkItemQueue>,
    agent: Arc<dyn AnalysisAgent>,
    aggregator: Arc<ProgressAggregator>,
    controller: Arc<BatchLifecycleController>,
    publisher: EventPublisher,
    backoff: BackoffCalculator,
    handles: parking_lot::Mutex<Vec<JoinHandle<()>>>,
}

impl ExecutorPool {
    pub fn new(
        config: &BatchCoreConfig,
        queue: Arc<WorkItemQueue>,
        agent: Arc<dyn AnalysisAgent>,
        aggregator: Arc<ProgressAggregator>,
        controller: Arc<BatchLifecycleController>,
        publisher: EventPublisher,
    ) -> Self {
        Self {
            worker_count: config.worker_count,
            queue,
            agent,
            aggregator,
            controller,
            publisher,
            backoff: BackoffCalculator::from_config(config),
            handles: parking_lot::Mutex::new(Vec::new()),
        }
    }

    /// Spawn the worker set. Idempotent per pool instance; calling twice
    /// would double the workers, so the system wires it exactly once.
    pub fn start(&self) {
        let mut handles = self.handles.lock();
        for worker_id in 0..self.worker_count {
            let ctx = WorkerContext {
                worker_id,
                queue: self.queue.clone(),
                agent: self.agent.clone(),
                aggregator: self.aggregator.clone(),
                controller: self.controller.clone(),
                publisher: self.publisher.clone(),
                backoff: self.backoff.clone(),
            };
            handles.push(tokio::spawn(worker_loop(ctx)));
        }
        info!(workers = self.worker_count, "Executor pool started");
    }

    /// Close the queue and wait for every worker to drain out.
    pub async fn shutdown(&self) {
        self.queue.close();
        let handles: Vec<_> = std::mem::take(&mut *self.handles.lock());
        let worker_count = handles.len();
        futures::future::join_all(handles).await;
        info!(workers = worker_count, "Executor pool stopped");
    }
}

async fn worker_loop(ctx: WorkerContext) {
    debug!(worker_id = ctx.worker_id, "Worker started");

    while let Some(item) = ctx.queue.dequeue().await {
        let batch_id = item.batch_id;

        // The batch may have been cancelled or finalized between the item
        // landing in the queue and this dequeue
        let Some(batch) = ctx.controller.active_batch(batch_id) else {
            ctx.queue.release(batch_id);
            continue;
        };
        if batch.is_cancelled() {
            ctx.queue.release(batch_id);
            continue;
        }

        ctx.controller.mark_running(&batch).await;
        execute_item(&ctx, &batch, item).await;
        ctx.queue.release(batch_id);
    }

    debug!(worker_id = ctx.worker_id, "Worker stopped");
}

async fn execute_item(ctx: &WorkerContext, batch: &ActiveBatch, item: WorkItem) {
    let batch_id = item.batch_id;
    let item_timeout = batch.configuration.item_timeout();
    let started = Instant::now();

    let invocation = timeout(
        item_timeout,
        ctx.agent
            .invoke(&batch.analysis_type, &item.payload, item_timeout),
    )
    .await;
    let elapsed_ms = started.elapsed().as_millis() as u64;

    match invocation {
        Ok(Ok(mut result)) => {
            result.processing_time_ms = elapsed_ms;
            if batch.is_cancelled() {
                debug!(batch_id = %batch_id, index = item.index, "Result dropped after cancellation");
                return;
            }
            log_item_operation(
                "analyze",
                batch_id,
                item.index,
                item.attempt_count,
                "completed",
                None,
            );
            if let Err(e) = ctx
                .aggregator
                .report_success(batch_id, item.index, result)
                .await
            {
                log_error("executor_pool", "report_success", &e.to_string(), None);
            }
        }
        Ok(Err(agent_error)) => {
            let retryable = agent_error.retryable;
            handle_item_failure(ctx, batch, item, retryable, agent_error.to_string()).await;
        }
        Err(_) => {
            let message = format!("analysis timed out after {}ms", item_timeout.as_millis());
            handle_item_failure(ctx, batch, item, true, message).await;
        }
    }
}

async fn handle_item_failure(
    ctx: &WorkerContext,
    batch: &ActiveBatch,
    item: WorkItem,
    retryable: bool,
    message: String,
) {
    let batch_id = item.batch_id;

    if retryable && item.attempt_count < batch.configuration.max_retries && !batch.is_cancelled() {
        let retry = item.next_attempt();
        let delay = ctx.backoff.delay_for_attempt(retry.attempt_count);
        log_item_operation(
            "analyze",
            batch_id,
            retry.index,
            retry.attempt_count,
            "retry_scheduled",
            Some(message.as_str()),
        );
        ctx.publisher.publish(
            events::ITEM_RETRIED,
            batch_id,
            json!({
                "itemIndex": retry.index,
                "attempt": retry.attempt_count,
                "delayMs": delay.as_millis() as u64,
                "error": message,
            }),
        );

        // Detached so the worker moves on; the retry re-enters the queue
        // after the backoff delay unless the batch finished first
        let queue = ctx.queue.clone();
        let priority = batch.priority;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if !queue.requeue(retry, priority) {
                debug!(batch_id = %batch_id, "Retry dropped for finished batch");
            }
        });
        return;
    }

    if batch.is_cancelled() {
        debug!(batch_id = %batch_id, index = item.index, "Failure dropped after cancellation");
        return;
    }

    log_item_operation(
        "analyze",
        batch_id,
        item.index,
        item.attempt_count,
        "failed",
        Some(message.as_str()),
    );
    if let Err(e) = ctx
        .aggregator
        .report_failure(batch_id, item.index, message)
        .await
    {
        log_error("executor_pool", "report_failure", &e.to_string(), None);
    }
}

// Worker behavior (retry, timeout, cancellation, reporting) is exercised
// end-to-end through BatchOrchestrationSystem in the integration suite.
