//! Input validation for batch submissions
//!
//! Rejects malformed submissions synchronously, before any item is
//! enqueued or any record is created - a rejected batch leaves no trace.
//! Payload checks bound JSON size and nesting so an oversized or
//! adversarial item cannot reach the store or the analysis agent.

use serde_json::Value;

use crate::agent::AnalysisAgent;
use crate::error::{BatchCoreError, Result};
use crate::orchestration::types::BatchSubmission;

/// Maximum allowed size for a single item payload (1MB)
const MAX_PAYLOAD_SIZE_BYTES: usize = 1024 * 1024;

/// Maximum nesting depth for payload objects/arrays
const MAX_PAYLOAD_DEPTH: usize = 10;

/// Validate a batch submission against the agent and payload limits.
pub fn validate_submission(submission: &BatchSubmission, agent: &dyn AnalysisAgent) -> Result<()> {
    if submission.owner_id.is_empty() {
        return Err(BatchCoreError::ValidationError(
            "ownerId cannot be empty".to_string(),
        ));
    }

    if submission.job_name.is_empty() {
        return Err(BatchCoreError::ValidationError(
            "jobName cannot be empty".to_string(),
        ));
    }

    if submission.job_type.is_empty() {
        return Err(BatchCoreError::ValidationError(
            "jobType cannot be empty".to_string(),
        ));
    }

    if submission.items.is_empty() {
        return Err(BatchCoreError::ValidationError(
            "batch contains no work items".to_string(),
        ));
    }

    if !agent.supports(&submission.analysis_type) {
        return Err(BatchCoreError::ValidationError(format!(
            "unknown analysis type: {}",
            submission.analysis_type
        )));
    }

    if let Some(overrides) = &submission.configuration {
        if overrides.concurrency_limit == Some(0) {
            return Err(BatchCoreError::ValidationError(
                "concurrencyLimit must be greater than 0".to_string(),
            ));
        }
        if overrides.item_timeout_ms == Some(0) {
            return Err(BatchCoreError::ValidationError(
                "itemTimeoutMs must be greater than 0".to_string(),
            ));
        }
    }

    for (index, payload) in submission.items.iter().enumerate() {
        validate_item_payload(index, payload)?;
    }

    Ok(())
}

/// Validate one item payload for size and structure constraints
fn validate_item_payload(index: usize, payload: &Value) -> Result<()> {
    let serialized = serde_json::to_string(payload).map_err(|e| {
        BatchCoreError::ValidationError(format!("item {index}: invalid JSON structure: {e}"))
    })?;

    if serialized.len() > MAX_PAYLOAD_SIZE_BYTES {
        return Err(BatchCoreError::ValidationError(format!(
            "item {index}: payload too large: {} bytes (max: {MAX_PAYLOAD_SIZE_BYTES})",
            serialized.len()
        )));
    }

    validate_payload_depth(index, payload, 0)
}

/// Validate payload nesting depth recursively
fn validate_payload_depth(index: usize, value: &Value, current_depth: usize) -> Result<()> {
    if current_depth > MAX_PAYLOAD_DEPTH {
        return Err(BatchCoreError::ValidationError(format!(
            "item {index}: payload nesting too deep: {current_depth} (max: {MAX_PAYLOAD_DEPTH})"
        )));
    }

    match value {
        Value::Object(map) => {
            for val in map.values() {
                validate_payload_depth(index, val, current_depth + 1)?;
            }
        }
        Value::Array(items) => {
            for val in items {
                validate_payload_depth(index, val, current_depth + 1)?;
            }
        }
        _ => {}
    }

    Ok(())
}
