//! Event Publisher Implementation
//!
//! 每个任务一个 broadcast 通道推送状态事件，同时保存最新状态供轮询

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};

use crate::application::ports::StatusCallback;
use crate::domain::pipeline::{PipelineResult, StatusEvent};

const CHANNEL_CAPACITY: usize = 100;

/// 任务事件
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum JobEvent {
    /// 状态变更
    StatusChanged { job_id: String, event: StatusEvent },
    /// 任务结束（成功或失败）
    Finished {
        job_id: String,
        result: PipelineResult,
    },
}

/// 事件发布器
pub struct EventPublisher {
    /// job_id -> broadcast sender
    job_channels: DashMap<String, broadcast::Sender<JobEvent>>,
    /// job_id -> 最新状态
    latest: DashMap<String, StatusEvent>,
}

impl EventPublisher {
    pub fn new() -> Self {
        Self {
            job_channels: DashMap::new(),
            latest: DashMap::new(),
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 注册任务的事件通道
    pub fn register_job(&self, job_id: &str) -> broadcast::Receiver<JobEvent> {
        if let Some(sender) = self.job_channels.get(job_id) {
            return sender.subscribe();
        }

        let (tx, rx) = broadcast::channel(CHANNEL_CAPACITY);
        self.job_channels.insert(job_id.to_string(), tx);
        rx
    }

    /// 取消注册任务，同时丢弃其最新状态
    pub fn unregister_job(&self, job_id: &str) {
        self.job_channels.remove(job_id);
        self.latest.remove(job_id);
    }

    pub fn subscribe(&self, job_id: &str) -> Option<broadcast::Receiver<JobEvent>> {
        self.job_channels.get(job_id).map(|s| s.subscribe())
    }

    /// 轮询任务最新状态
    pub fn latest_status(&self, job_id: &str) -> Option<StatusEvent> {
        self.latest.get(job_id).map(|e| e.clone())
    }

    /// 为任务创建 StatusCallback
    pub fn sink(self: &Arc<Self>, job_id: impl Into<String>) -> JobStatusSink {
        JobStatusSink {
            job_id: job_id.into(),
            publisher: Arc::clone(self),
        }
    }

    /// 发布状态事件
    ///
    /// 只记录已注册任务的最新状态，未注册的任务事件直接丢弃
    pub fn publish_status(&self, job_id: &str, event: StatusEvent) {
        tracing::debug!(
            job_id = %job_id,
            status = %event.status,
            stage = event.stage,
            "Pipeline status"
        );
        if !self.job_channels.contains_key(job_id) {
            return;
        }
        self.latest.insert(job_id.to_string(), event.clone());
        self.publish_to_job(
            job_id,
            JobEvent::StatusChanged {
                job_id: job_id.to_string(),
                event,
            },
        );
    }

    /// 发布任务结束事件
    pub fn publish_finished(&self, job_id: &str, result: &PipelineResult) {
        self.publish_to_job(
            job_id,
            JobEvent::Finished {
                job_id: job_id.to_string(),
                result: result.clone(),
            },
        );
    }

    fn publish_to_job(&self, job_id: &str, event: JobEvent) {
        if let Some(sender) = self.job_channels.get(job_id) {
            if let Err(e) = sender.send(event) {
                tracing::debug!(
                    job_id = %job_id,
                    error = %e,
                    "Failed to publish event (no receivers)"
                );
            }
        }
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new()
    }
}

/// 接收下一个任务事件
///
/// 消费过慢丢失的事件直接跳过，只有通道关闭时返回 None
pub async fn next_job_event(rx: &mut broadcast::Receiver<JobEvent>) -> Option<JobEvent> {
    loop {
        match rx.recv().await {
            Ok(event) => return Some(event),
            Err(RecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "Job event receiver lagged");
            }
            Err(RecvError::Closed) => return None,
        }
    }
}

/// 单个任务的状态回调，转发到 EventPublisher
pub struct JobStatusSink {
    job_id: String,
    publisher: Arc<EventPublisher>,
}

impl JobStatusSink {
    pub fn job_id(&self) -> &str {
        &self.job_id
    }
}

impl StatusCallback for JobStatusSink {
    fn on_status(&self, event: StatusEvent) {
        self.publisher.publish_status(&self.job_id, event);
    }
}
