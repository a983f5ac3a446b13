//! # Orchestration Types
//!
//! Shared request and result types used across the orchestration
//! components.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::constants::system::DEFAULT_PRIORITY;
use crate::models::BatchConfigurationOverrides;
use crate::state_machine::BatchState;

/// A client's batch submission: work items plus attribution and options.
///
/// Built with the constructor plus `with_*` methods so HTTP-layer callers
/// can map request bodies without positional churn.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSubmission {
    pub owner_id: String,
    pub project_id: Option<String>,
    pub job_name: String,
    pub job_type: String,
    pub analysis_type: String,
    /// Ordered work-item payloads; index in this list is the item index
    /// for results and the error log
    pub items: Vec<Value>,
    /// Higher runs sooner; defaults to 1
    pub priority: i32,
    /// Per-batch execution overrides; unset fields use process defaults
    pub configuration: Option<BatchConfigurationOverrides>,
}

impl BatchSubmission {
    pub fn new(
        owner_id: impl Into<String>,
        job_name: impl Into<String>,
        job_type: impl Into<String>,
        analysis_type: impl Into<String>,
        items: Vec<Value>,
    ) -> Self {
        Self {
            owner_id: owner_id.into(),
            project_id: None,
            job_name: job_name.into(),
            job_type: job_type.into(),
            analysis_type: analysis_type.into(),
            items,
            priority: DEFAULT_PRIORITY,
            configuration: None,
        }
    }

    pub fn with_project(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_configuration(mut self, overrides: BatchConfigurationOverrides) -> Self {
        self.configuration = Some(overrides);
        self
    }
}

/// Outcome of a batch's terminal transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizationResult {
    pub batch_id: Uuid,
    pub final_state: BatchState,
    pub completed_items: u32,
    pub failed_items: u32,
    pub total_items: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_submission_builder() {
        let submission = BatchSubmission::new(
            "user-7",
            "competitor landscape",
            "patent_analysis",
            "landscape",
            vec![json!({"patentNumber": "EP999"})],
        )
        .with_project("project-2")
        .with_priority(5);

        assert_eq!(submission.priority, 5);
        assert_eq!(submission.project_id.as_deref(), Some("project-2"));
        assert!(submission.configuration.is_none());
    }
}
