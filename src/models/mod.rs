//! Data layer: the persisted batch snapshot and the in-memory work item.

pub mod batch_job;
pub mod work_item;

pub use batch_job::{
    progress_for, AnalysisResult, BatchConfiguration, BatchConfigurationOverrides, BatchJob,
    ErrorLogEntry,
};
pub use work_item::WorkItem;
