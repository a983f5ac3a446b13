//! # Batch Job Model
//!
//! The persisted snapshot of one batch submission. Field names and status
//! strings serialize exactly as the backend's `batch_jobs` records expect
//! (camelCase attributes, lowercase statuses, `queued` creation default),
//! so snapshots written here remain readable alongside existing rows.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::config::BatchCoreConfig;
use crate::state_machine::BatchState;

/// One batch submission: a named collection of patent-analysis work items
/// processed together under a single job record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchJob {
    /// Opaque unique identifier, assigned at creation, immutable
    pub id: Uuid,
    /// Owning user, opaque foreign key
    pub owner_id: String,
    /// Optional project attribution, opaque foreign key
    pub project_id: Option<String>,
    pub job_name: String,
    pub job_type: String,
    /// Selects which agent behavior is invoked per item
    pub analysis_type: String,
    /// Ordered work-item payloads, immutable after submission
    pub items: Vec<Value>,
    pub status: BatchState,
    /// Higher runs sooner; default 1
    pub priority: i32,
    /// Derived percentage in [0, 100]; never stored independently of the
    /// counts it is computed from
    pub progress: u8,
    pub total_items: u32,
    pub completed_items: u32,
    pub failed_items: u32,
    /// Analysis results keyed by item index, populated only for succeeded
    /// items
    pub results: BTreeMap<u32, AnalysisResult>,
    /// Append-only failure log, ordered by the time each failure was
    /// reported
    pub error_log: Vec<ErrorLogEntry>,
    pub created_at: DateTime<Utc>,
    /// Set once, on first item dequeue
    pub started_at: Option<DateTime<Utc>>,
    /// Set once, on the terminal transition
    pub completed_at: Option<DateTime<Utc>>,
    /// Recomputed on every progress update while running; cleared on the
    /// terminal transition
    pub estimated_completion_time: Option<DateTime<Utc>>,
    /// Immutable options snapshot resolved at submission time
    pub configuration: BatchConfiguration,
}

impl BatchJob {
    /// Create a new batch in the `queued` state.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        owner_id: String,
        project_id: Option<String>,
        job_name: String,
        job_type: String,
        analysis_type: String,
        items: Vec<Value>,
        priority: i32,
        configuration: BatchConfiguration,
    ) -> Self {
        let total_items = items.len() as u32;
        Self {
            id: Uuid::new_v4(),
            owner_id,
            project_id,
            job_name,
            job_type,
            analysis_type,
            items,
            status: BatchState::default(),
            priority,
            progress: 0,
            total_items,
            completed_items: 0,
            failed_items: 0,
            results: BTreeMap::new(),
            error_log: Vec::new(),
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            estimated_completion_time: None,
            configuration,
        }
    }

    /// Items accounted for so far (succeeded + terminally failed)
    pub fn accounted_items(&self) -> u32 {
        self.completed_items + self.failed_items
    }

    /// Whether every item has reached a terminal outcome
    pub fn all_items_accounted(&self) -> bool {
        self.accounted_items() == self.total_items
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Record one succeeded item and recompute derived progress.
    ///
    /// Idempotence per `(batch, index)` is enforced by the aggregator; this
    /// method assumes the index has not been counted before.
    pub fn record_success(&mut self, index: u32, result: AnalysisResult) {
        self.completed_items += 1;
        self.results.insert(index, result);
        self.recompute_progress();
    }

    /// Record one terminally failed item and recompute derived progress.
    pub fn record_failure(&mut self, index: u32, error_message: String) {
        self.failed_items += 1;
        self.error_log.push(ErrorLogEntry {
            item_index: Some(index),
            error_message,
            occurred_at: Utc::now(),
        });
        self.recompute_progress();
    }

    /// Append a batch-level error entry (system failure, not tied to one
    /// item index).
    pub fn record_system_error(&mut self, error_message: String) {
        self.error_log.push(ErrorLogEntry {
            item_index: None,
            error_message,
            occurred_at: Utc::now(),
        });
    }

    pub fn recompute_progress(&mut self) {
        self.progress = progress_for(self.completed_items, self.failed_items, self.total_items);
    }
}

/// Derived percent-complete: `round(100 * (completed + failed) / total)`.
pub fn progress_for(completed_items: u32, failed_items: u32, total_items: u32) -> u8 {
    if total_items == 0 {
        return 0;
    }
    let accounted = completed_items + failed_items;
    let pct = (100.0 * f64::from(accounted) / f64::from(total_items)).round();
    pct.clamp(0.0, 100.0) as u8
}

/// One entry in a batch's failure log.
///
/// `item_index` is `None` for synthetic batch-level entries recorded on
/// system failures; item failures always carry their index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorLogEntry {
    pub item_index: Option<u32>,
    pub error_message: String,
    pub occurred_at: DateTime<Utc>,
}

/// Result of one item's analysis, as produced by the analysis agent.
///
/// Mirrors the per-analysis attributes the backend records for a single
/// patent: an opaque result document plus optional summary and confidence,
/// and the measured processing time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub data: Value,
    pub summary: Option<String>,
    pub confidence_score: Option<f64>,
    pub processing_time_ms: u64,
}

impl AnalysisResult {
    pub fn new(data: Value) -> Self {
        Self {
            data,
            summary: None,
            confidence_score: None,
            processing_time_ms: 0,
        }
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn with_confidence_score(mut self, score: f64) -> Self {
        self.confidence_score = Some(score);
        self
    }
}

/// Resolved per-batch execution options, stored on the job snapshot.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BatchConfiguration {
    /// Maximum items of this batch in flight at once
    pub concurrency_limit: usize,
    /// Retries per item before terminal failure
    pub max_retries: u32,
    /// Per-item agent invocation timeout
    pub item_timeout_ms: u64,
}

impl BatchConfiguration {
    pub fn defaults_from(config: &BatchCoreConfig) -> Self {
        Self {
            concurrency_limit: config.default_concurrency_limit,
            max_retries: config.default_max_retries,
            item_timeout_ms: config.default_item_timeout_ms,
        }
    }

    pub fn item_timeout(&self) -> Duration {
        Duration::from_millis(self.item_timeout_ms)
    }
}

/// Caller-supplied overrides for a submission; unset fields fall back to
/// the process defaults and `concurrency_limit` is clamped to the global
/// ceiling.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BatchConfigurationOverrides {
    pub concurrency_limit: Option<usize>,
    pub max_retries: Option<u32>,
    pub item_timeout_ms: Option<u64>,
}

impl BatchConfigurationOverrides {
    pub fn resolve(&self, config: &BatchCoreConfig) -> BatchConfiguration {
        let defaults = BatchConfiguration::defaults_from(config);
        BatchConfiguration {
            concurrency_limit: self
                .concurrency_limit
                .unwrap_or(defaults.concurrency_limit)
                .min(config.max_concurrency_limit),
            max_retries: self.max_retries.unwrap_or(defaults.max_retries),
            item_timeout_ms: self.item_timeout_ms.unwrap_or(defaults.item_timeout_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_job(total: usize) -> BatchJob {
        let items = (0..total).map(|i| json!({ "patentNumber": i })).collect();
        BatchJob::new(
            "user-1".to_string(),
            None,
            "q3 portfolio sweep".to_string(),
            "patent_analysis".to_string(),
            "prior_art".to_string(),
            items,
            1,
            BatchConfiguration::defaults_from(&BatchCoreConfig::default()),
        )
    }

    #[test]
    fn test_new_batch_defaults() {
        let job = sample_job(4);
        assert_eq!(job.status, BatchState::Queued);
        assert_eq!(job.total_items, 4);
        assert_eq!(job.progress, 0);
        assert_eq!(job.priority, 1);
        assert!(job.started_at.is_none());
        assert!(job.completed_at.is_none());
        assert!(job.estimated_completion_time.is_none());
    }

    #[test]
    fn test_progress_formula_rounding() {
        assert_eq!(progress_for(0, 0, 3), 0);
        assert_eq!(progress_for(1, 0, 3), 33);
        assert_eq!(progress_for(1, 1, 3), 67);
        assert_eq!(progress_for(2, 1, 3), 100);
        assert_eq!(progress_for(1, 0, 8), 13);
    }

    #[test]
    fn test_record_success_and_failure_update_counts() {
        let mut job = sample_job(2);
        job.record_success(0, AnalysisResult::new(json!({"score": 0.9})));
        assert_eq!(job.completed_items, 1);
        assert_eq!(job.progress, 50);

        job.record_failure(1, "agent timed out".to_string());
        assert_eq!(job.failed_items, 1);
        assert_eq!(job.progress, 100);
        assert_eq!(job.error_log.len(), 1);
        assert_eq!(job.error_log[0].item_index, Some(1));
        assert!(job.all_items_accounted());
    }

    #[test]
    fn test_system_error_entry_has_no_index() {
        let mut job = sample_job(1);
        job.record_system_error("store unavailable".to_string());
        assert_eq!(job.error_log[0].item_index, None);
        assert_eq!(job.failed_items, 0);
    }

    #[test]
    fn test_snapshot_wire_format() {
        let job = sample_job(1);
        let value = serde_json::to_value(&job).unwrap();
        let object = value.as_object().unwrap();
        for key in [
            "ownerId",
            "jobName",
            "jobType",
            "analysisType",
            "totalItems",
            "completedItems",
            "failedItems",
            "errorLog",
            "createdAt",
            "estimatedCompletionTime",
        ] {
            assert!(object.contains_key(key), "missing wire field {key}");
        }
        assert_eq!(object["status"], json!("queued"));
    }

    #[test]
    fn test_overrides_clamp_to_ceiling() {
        let config = BatchCoreConfig::default();
        let overrides = BatchConfigurationOverrides {
            concurrency_limit: Some(500),
            max_retries: Some(1),
            item_timeout_ms: None,
        };
        let resolved = overrides.resolve(&config);
        assert_eq!(resolved.concurrency_limit, config.max_concurrency_limit);
        assert_eq!(resolved.max_retries, 1);
        assert_eq!(resolved.item_timeout_ms, config.default_item_timeout_ms);
    }
}
