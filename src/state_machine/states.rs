use serde::{Deserialize, Serialize};
use std::fmt;

/// Batch lifecycle states.
///
/// The serialized strings match the `status` column of the existing
/// `batch_jobs` records, so snapshots written by this crate stay readable
/// by the backend that owns the rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchState {
    /// Initial state when the batch is created and its items are enqueued
    Queued,
    /// At least one item has been dequeued by a worker
    Running,
    /// All items accounted for and none failed
    Completed,
    /// All items accounted for and at least one failed
    Failed,
    /// Batch was cancelled before all items were accounted for
    Cancelled,
}

impl BatchState {
    /// Check if this is a terminal state (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Check if this is an active state (items are being processed)
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Running)
    }
}

impl fmt::Display for BatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Queued => write!(f, "queued"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::str::FromStr for BatchState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(Self::Queued),
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("Invalid batch state: {s}")),
        }
    }
}

/// Default state for new batches
impl Default for BatchState {
    fn default() -> Self {
        Self::Queued
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_check() {
        assert!(BatchState::Completed.is_terminal());
        assert!(BatchState::Failed.is_terminal());
        assert!(BatchState::Cancelled.is_terminal());
        assert!(!BatchState::Queued.is_terminal());
        assert!(!BatchState::Running.is_terminal());
    }

    #[test]
    fn test_string_conversion() {
        assert_eq!(BatchState::Running.to_string(), "running");
        assert_eq!("queued".parse::<BatchState>().unwrap(), BatchState::Queued);
        assert_eq!(
            "cancelled".parse::<BatchState>().unwrap(),
            BatchState::Cancelled
        );
        assert!("canceled".parse::<BatchState>().is_err());
    }

    #[test]
    fn test_state_serde() {
        let json = serde_json::to_string(&BatchState::Failed).unwrap();
        assert_eq!(json, "\"failed\"");

        let parsed: BatchState = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, BatchState::Failed);
    }

    #[test]
    fn test_default_is_queued() {
        assert_eq!(BatchState::default(), BatchState::Queued);
    }
}
