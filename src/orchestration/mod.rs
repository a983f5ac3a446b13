//! # Orchestration Engine
//!
//! Concurrency-safe batch execution core. A submitted batch flows through
//! these components:
//!
//! - **WorkItemQueue**: priority-then-FIFO holding area with per-batch
//!   admission control and atomic cancellation
//! - **ExecutorPool**: fixed worker set invoking the external analysis
//!   agent with per-item timeouts and capped, jittered retries
//! - **ProgressAggregator**: idempotent per-item outcome accounting,
//!   serialized per batch
//! - **BatchLifecycleController**: the batch state machine applied to
//!   live records - start, terminal transitions, cancellation, and
//!   system-failure demotion
//! - **EtaEstimator**: completion estimates from observed throughput
//! - **BatchOrchestrationSystem**: wiring plus the submission API

pub mod backoff_calculator;
pub mod batch_controller;
pub mod eta_estimator;
pub mod executor_pool;
pub mod progress_aggregator;
pub mod system;
pub mod types;
pub mod work_item_queue;

// Re-export core types and components for easy access
pub use backoff_calculator::BackoffCalculator;
pub use batch_controller::{ActiveBatch, BatchLifecycleController, BatchRunState};
pub use eta_estimator::EtaEstimator;
pub use executor_pool::ExecutorPool;
pub use progress_aggregator::ProgressAggregator;
pub use system::BatchOrchestrationSystem;
pub use types::{BatchSubmission, FinalizationResult};
pub use work_item_queue::{QueueError, WorkItemQueue};
