use crate::error::{BatchCoreError, Result};

/// Process-wide orchestration configuration.
///
/// Built once at startup and passed explicitly to the components that need
/// it; nothing in the crate reads configuration as ambient global state.
#[derive(Debug, Clone)]
pub struct BatchCoreConfig {
    /// Number of executor pool workers per process.
    pub worker_count: usize,
    /// Per-batch concurrency limit applied when a submission does not
    /// override it.
    pub default_concurrency_limit: usize,
    /// Ceiling for per-batch concurrency overrides.
    pub max_concurrency_limit: usize,
    /// Retries per work item before it is recorded as a terminal failure.
    pub default_max_retries: u32,
    /// Per-item agent invocation timeout in milliseconds.
    pub default_item_timeout_ms: u64,
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
    pub backoff_multiplier: f64,
    pub backoff_jitter: bool,
    pub event_channel_capacity: usize,
    /// Minimum spacing between persisted `running` snapshots. Snapshots of
    /// running batches are observability only; terminal flushes ignore this.
    pub running_snapshot_interval_ms: u64,
}

impl Default for BatchCoreConfig {
    fn default() -> Self {
        Self {
            worker_count: 8,
            default_concurrency_limit: 4,
            max_concurrency_limit: 16,
            default_max_retries: 3,
            default_item_timeout_ms: 30_000,
            backoff_base_ms: 1_000,
            backoff_max_ms: 30_000,
            backoff_multiplier: 2.0,
            backoff_jitter: true,
            event_channel_capacity: 1_024,
            running_snapshot_interval_ms: 1_000,
        }
    }
}

impl BatchCoreConfig {
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(workers) = std::env::var("PATANALYSE_WORKER_COUNT") {
            config.worker_count = workers.parse().map_err(|e| {
                BatchCoreError::ConfigurationError(format!("Invalid worker_count: {e}"))
            })?;
        }

        if let Ok(limit) = std::env::var("PATANALYSE_DEFAULT_CONCURRENCY_LIMIT") {
            config.default_concurrency_limit = limit.parse().map_err(|e| {
                BatchCoreError::ConfigurationError(format!("Invalid default_concurrency_limit: {e}"))
            })?;
        }

        if let Ok(ceiling) = std::env::var("PATANALYSE_MAX_CONCURRENCY_LIMIT") {
            config.max_concurrency_limit = ceiling.parse().map_err(|e| {
                BatchCoreError::ConfigurationError(format!("Invalid max_concurrency_limit: {e}"))
            })?;
        }

        if let Ok(retries) = std::env::var("PATANALYSE_MAX_RETRIES") {
            config.default_max_retries = retries.parse().map_err(|e| {
                BatchCoreError::ConfigurationError(format!("Invalid default_max_retries: {e}"))
            })?;
        }

        if let Ok(timeout) = std::env::var("PATANALYSE_ITEM_TIMEOUT_MS") {
            config.default_item_timeout_ms = timeout.parse().map_err(|e| {
                BatchCoreError::ConfigurationError(format!("Invalid default_item_timeout_ms: {e}"))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.worker_count == 0 {
            return Err(BatchCoreError::ConfigurationError(
                "worker_count must be greater than 0".to_string(),
            ));
        }
        if self.default_concurrency_limit == 0 {
            return Err(BatchCoreError::ConfigurationError(
                "default_concurrency_limit must be greater than 0".to_string(),
            ));
        }
        if self.max_concurrency_limit < self.default_concurrency_limit {
            return Err(BatchCoreError::ConfigurationError(
                "max_concurrency_limit must be at least default_concurrency_limit".to_string(),
            ));
        }
        if self.default_item_timeout_ms == 0 {
            return Err(BatchCoreError::ConfigurationError(
                "default_item_timeout_ms must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}
