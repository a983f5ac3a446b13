//! # Analysis Agent Interface
//!
//! The external capability that performs the actual patent-analysis
//! computation for one work item. The core does not know or control its
//! internals; it treats the agent as a collaborator with latency and
//! failure it must tolerate. Implementations live outside this crate
//! (tests ship scriptable fakes).

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::models::AnalysisResult;

/// Narrow invocation contract for the external analysis capability.
#[async_trait]
pub trait AnalysisAgent: Send + Sync {
    /// Whether this agent knows how to run the given analysis type.
    ///
    /// Consulted at submission time; an unsupported type is a validation
    /// error and no batch is created.
    fn supports(&self, analysis_type: &str) -> bool;

    /// Analyze one work-item payload.
    ///
    /// `timeout` is advisory for the agent's own internal budgeting; the
    /// executor pool enforces it regardless, so a stuck agent cannot hold
    /// a worker past the configured per-item timeout.
    async fn invoke(
        &self,
        analysis_type: &str,
        payload: &Value,
        timeout: Duration,
    ) -> std::result::Result<AnalysisResult, AgentError>;
}

/// Failure reported by (or on behalf of) an agent invocation.
///
/// `retryable` drives the executor's retry decision: transient failures
/// are re-enqueued with backoff until the item's retry budget is spent,
/// non-retryable failures are recorded as terminal immediately.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct AgentError {
    pub message: String,
    pub error_type: Option<String>,
    pub retryable: bool,
}

impl AgentError {
    /// A transient failure worth retrying (network hiccup, rate limit,
    /// upstream overload).
    pub fn retryable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            error_type: None,
            retryable: true,
        }
    }

    /// A permanent failure; retrying would burn attempts for nothing
    /// (malformed payload, unsupported document).
    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            error_type: None,
            retryable: false,
        }
    }

    pub fn with_error_type(mut self, error_type: impl Into<String>) -> Self {
        self.error_type = Some(error_type.into());
        self
    }
}
