#![allow(clippy::doc_markdown)] // Allow technical terms like JSON, ETA in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # PatAnalyse Core Rust
//!
//! High-performance Rust implementation of the batch orchestration engine
//! behind the PatAnalyse patent-analysis backend.
//!
//! ## Overview
//!
//! The backend models a batch job as a row with status, progress, and
//! counts; this crate is the engine that actually drives those rows:
//! accept a batch of N analysis work items, execute them concurrently
//! against a rate-limited and failure-prone analysis agent, track
//! granular per-item progress, tolerate partial failure without aborting
//! the batch, and keep the estimated completion time continuously
//! updated.
//!
//! ## Architecture
//!
//! A fixed executor pool pulls items from a priority queue with per-batch
//! admission control, invokes the external [`agent::AnalysisAgent`] per
//! item, and reports outcomes to a per-batch serialized aggregator. The
//! lifecycle controller applies the `queued → running →
//! completed/failed/cancelled` state machine and flushes snapshots
//! through the [`store::BatchStore`] seam exactly once per terminal
//! transition.
//!
//! ## Module Organization
//!
//! - [`models`] - `BatchJob` snapshot and in-memory work items
//! - [`state_machine`] - Batch lifecycle states and transitions
//! - [`orchestration`] - Queue, executor pool, aggregator, controller
//! - [`agent`] - External analysis agent interface
//! - [`store`] - Snapshot persistence seam
//! - [`events`] - Lifecycle event broadcasting
//! - [`config`] - Process-wide immutable configuration
//! - [`error`] - Structured error handling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use patanalyse_core::config::BatchCoreConfig;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Initialize configuration once at startup and pass it explicitly;
//! // nothing reads it as ambient global state
//! let config = BatchCoreConfig::from_env()?;
//! println!("executor workers: {}", config.worker_count);
//! # Ok(())
//! # }
//! ```
//!
//! See [`orchestration::BatchOrchestrationSystem`] for the submission
//! API an HTTP layer builds on.

pub mod agent;
pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod logging;
pub mod models;
pub mod orchestration;
pub mod state_machine;
pub mod store;
pub mod validation;

pub use agent::{AgentError, AnalysisAgent};
pub use config::BatchCoreConfig;
pub use constants::BatchStatus;
pub use error::{BatchCoreError, Result};
pub use events::{EventPublisher, OrchestrationEvent};
pub use models::{AnalysisResult, BatchConfiguration, BatchJob, ErrorLogEntry, WorkItem};
pub use orchestration::{BatchOrchestrationSystem, BatchSubmission, FinalizationResult};
pub use state_machine::{BatchEvent, BatchState};
pub use store::{BatchStore, InMemoryBatchStore, StoreError};
