//! Shared fixtures for the integration suite: a scriptable analysis
//! agent with configurable latency and per-item failure scripts, plus
//! polling helpers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use uuid::Uuid;

use patanalyse_core::agent::{AgentError, AnalysisAgent};
use patanalyse_core::config::BatchCoreConfig;
use patanalyse_core::models::AnalysisResult;
use patanalyse_core::orchestration::BatchOrchestrationSystem;
use patanalyse_core::BatchJob;

/// Test agent with constant latency and scripted per-item failures.
///
/// Work-item payloads built by `items_with_indexes` carry their index so
/// the agent can look up its script without the orchestrator leaking
/// indexes through the invocation contract.
pub struct ScriptedAgent {
    latency: Duration,
    /// Remaining transient failures per item index
    transient_failures: Mutex<HashMap<u32, u32>>,
    /// Item indexes that always fail with a non-retryable error
    fatal_indexes: Vec<u32>,
    invocations: AtomicU32,
}

impl ScriptedAgent {
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            transient_failures: Mutex::new(HashMap::new()),
            fatal_indexes: Vec::new(),
            invocations: AtomicU32::new(0),
        }
    }

    /// Fail the given item index `times` times with a retryable error,
    /// then succeed.
    pub fn fail_times(self, index: u32, times: u32) -> Self {
        self.transient_failures.lock().unwrap().insert(index, times);
        self
    }

    /// Fail the given item index on every attempt with a retryable error.
    pub fn always_fail(self, index: u32) -> Self {
        self.fail_times(index, u32::MAX)
    }

    /// Fail the given item index immediately with a non-retryable error.
    pub fn fail_fatally(mut self, index: u32) -> Self {
        self.fatal_indexes.push(index);
        self
    }

    pub fn invocation_count(&self) -> u32 {
        self.invocations.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl AnalysisAgent for ScriptedAgent {
    fn supports(&self, analysis_type: &str) -> bool {
        analysis_type != "unsupported"
    }

    async fn invoke(
        &self,
        _analysis_type: &str,
        payload: &Value,
        _timeout: Duration,
    ) -> Result<AnalysisResult, AgentError> {
        self.invocations.fetch_add(1, Ordering::Relaxed);
        tokio::time::sleep(self.latency).await;

        let index = payload["index"].as_u64().expect("payload carries index") as u32;

        if self.fatal_indexes.contains(&index) {
            return Err(AgentError::fatal(format!(
                "unparseable document for item {index}"
            )));
        }

        let mut failures = self.transient_failures.lock().unwrap();
        if let Some(remaining) = failures.get_mut(&index) {
            if *remaining > 0 {
                *remaining = remaining.saturating_sub(1);
                return Err(
                    AgentError::retryable(format!("transient analysis failure for item {index}"))
                        .with_error_type("scripted"),
                );
            }
        }
        drop(failures);

        Ok(AnalysisResult::new(json!({ "analyzedIndex": index }))
            .with_summary(format!("analysis of item {index}"))
            .with_confidence_score(0.92))
    }
}

/// Item payloads that carry their own index for the scripted agent.
pub fn items_with_indexes(count: u32) -> Vec<Value> {
    (0..count)
        .map(|i| json!({ "index": i, "patentNumber": format!("US{:07}", i) }))
        .collect()
}

/// Fast-cycling configuration for tests: short backoff without jitter so
/// retry timing stays predictable, frequent running snapshots.
pub fn test_config(worker_count: usize) -> BatchCoreConfig {
    BatchCoreConfig {
        worker_count,
        backoff_base_ms: 10,
        backoff_max_ms: 40,
        backoff_jitter: false,
        running_snapshot_interval_ms: 20,
        ..BatchCoreConfig::default()
    }
}

/// Poll `get_batch` until the batch reaches a terminal state.
pub async fn wait_for_terminal(
    system: &BatchOrchestrationSystem,
    batch_id: Uuid,
    deadline: Duration,
) -> BatchJob {
    let poll = async {
        loop {
            if let Some(snapshot) = system.get_batch(batch_id).await.unwrap() {
                if snapshot.is_terminal() {
                    return snapshot;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    };
    tokio::time::timeout(deadline, poll)
        .await
        .expect("batch did not reach a terminal state in time")
}

/// Poll until the batch has accounted for at least `count` items.
pub async fn wait_for_accounted(
    system: &BatchOrchestrationSystem,
    batch_id: Uuid,
    count: u32,
    deadline: Duration,
) -> BatchJob {
    let poll = async {
        loop {
            if let Some(snapshot) = system.get_batch(batch_id).await.unwrap() {
                if snapshot.completed_items + snapshot.failed_items >= count {
                    return snapshot;
                }
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    };
    tokio::time::timeout(deadline, poll)
        .await
        .expect("batch did not account for enough items in time")
}
