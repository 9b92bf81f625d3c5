//! Worker Layer - Background Pipeline Processing
//!
//! 实现 PipelineWorker，并发执行视频检测流水线

mod pipeline_worker;

pub use pipeline_worker::{PipelineJob, PipelineWorker, PipelineWorkerConfig};
