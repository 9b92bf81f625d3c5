//! Events - 任务状态事件推送

mod publisher;

pub use publisher::{next_job_event, EventPublisher, JobEvent, JobStatusSink};
