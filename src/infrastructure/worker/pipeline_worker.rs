//! Pipeline Worker - Background Video Pipeline Processor

use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

use crate::application::commands::{handlers::PipelineCoordinator, ProcessVideoCommand};
use crate::domain::pipeline::PipelineResult;
use crate::infrastructure::events::EventPublisher;

/// Worker 配置
#[derive(Debug, Clone)]
pub struct PipelineWorkerConfig {
    /// 最大并发流水线数
    pub max_concurrent: usize,
}

impl Default for PipelineWorkerConfig {
    fn default() -> Self {
        Self { max_concurrent: 2 }
    }
}

/// 队列中的任务
pub struct PipelineJob {
    pub job_id: String,
    pub command: ProcessVideoCommand,
    /// 结果回传通道，调用方不关心结果时为 None
    pub reply: Option<oneshot::Sender<PipelineResult>>,
}

impl PipelineJob {
    pub fn new(command: ProcessVideoCommand) -> Self {
        Self {
            job_id: uuid::Uuid::new_v4().to_string(),
            command,
            reply: None,
        }
    }

    /// 附加结果回传通道
    pub fn with_reply(mut self) -> (Self, oneshot::Receiver<PipelineResult>) {
        let (tx, rx) = oneshot::channel();
        self.reply = Some(tx);
        (self, rx)
    }
}

/// 流水线 Worker
///
/// 从队列消费任务，用 semaphore 限制并发运行的流水线数量
pub struct PipelineWorker {
    config: PipelineWorkerConfig,
    queue_receiver: mpsc::Receiver<PipelineJob>,
    coordinator: Arc<PipelineCoordinator>,
    event_publisher: Arc<EventPublisher>,
}

impl PipelineWorker {
    pub fn new(
        config: PipelineWorkerConfig,
        queue_receiver: mpsc::Receiver<PipelineJob>,
        coordinator: Arc<PipelineCoordinator>,
        event_publisher: Arc<EventPublisher>,
    ) -> Self {
        Self {
            config,
            queue_receiver,
            coordinator,
            event_publisher,
        }
    }

    /// 启动 Worker，队列关闭且所有任务结束后返回
    pub async fn run(mut self) {
        tracing::info!(
            max_concurrent = self.config.max_concurrent,
            "PipelineWorker started"
        );

        let semaphore = Arc::new(tokio::sync::Semaphore::new(self.config.max_concurrent));
        let mut running = tokio::task::JoinSet::new();

        while let Some(job) = self.queue_receiver.recv().await {
            let permit = match semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    tracing::error!(job_id = %job.job_id, error = %e, "Failed to acquire semaphore permit");
                    continue;
                }
            };

            let coordinator = self.coordinator.clone();
            let event_publisher = self.event_publisher.clone();

            running.spawn(async move {
                let _permit = permit; // 持有 permit 直到任务完成
                Self::process_job(job, coordinator, event_publisher).await;
            });
        }

        while let Some(joined) = running.join_next().await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "Pipeline task panicked");
            }
        }

        tracing::info!("PipelineWorker stopped");
    }

    async fn process_job(
        job: PipelineJob,
        coordinator: Arc<PipelineCoordinator>,
        event_publisher: Arc<EventPublisher>,
    ) {
        let PipelineJob {
            job_id,
            command,
            reply,
        } = job;

        tracing::info!(
            job_id = %job_id,
            video = %command.video_path.display(),
            "Pipeline job started"
        );

        let sink = event_publisher.sink(job_id.clone());
        let result = coordinator.process_video(command, &sink).await;
        event_publisher.publish_finished(&job_id, &result);

        if result.success {
            tracing::info!(
                job_id = %job_id,
                output = ?result.annotated_video_path,
                "Pipeline job completed"
            );
        } else {
            tracing::error!(
                job_id = %job_id,
                error = result.error.as_deref().unwrap_or("unknown"),
                "Pipeline job failed"
            );
        }

        if let Some(reply) = reply {
            if reply.send(result).is_err() {
                tracing::debug!(job_id = %job_id, "Result receiver dropped");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::commands::PipelineOptions;
    use crate::domain::pipeline::{PipelineStatus, StageOutcome};
    use crate::infrastructure::adapters::process::test_tools;
    use crate::infrastructure::adapters::{
        FakeChatClient, FfmpegTranscoder, LlmPromptRefiner, ProcessFrameAnalyzer,
        ProcessFrameExtractor, ProcessVideoAnnotator, PromptRefinerConfig, TranscodeProfile,
    };
    use crate::infrastructure::events::JobEvent;
    use std::path::Path;
    use tempfile::tempdir;

    fn coordinator(dir: &Path) -> Arc<PipelineCoordinator> {
        let chat = Arc::new(FakeChatClient::replying("hf", "Detect smiling people"));
        Arc::new(PipelineCoordinator::new(
            Arc::new(LlmPromptRefiner::new(chat, PromptRefinerConfig::default())),
            Arc::new(ProcessFrameExtractor::new(test_tools::extractor(dir))),
            Arc::new(ProcessFrameAnalyzer::new(
                test_tools::analyzer(dir),
                vec![("HF_TOKEN".to_string(), "hf_test".to_string())],
            )),
            Arc::new(ProcessVideoAnnotator::new(test_tools::annotator(dir))),
            Arc::new(FfmpegTranscoder::new(
                test_tools::encoder(dir),
                TranscodeProfile::default(),
            )),
        ))
    }

    fn command(dir: &Path, keep: bool) -> ProcessVideoCommand {
        let video = dir.join("clip.mp4");
        std::fs::write(&video, b"video").unwrap();
        let options = PipelineOptions {
            work_dir: dir.join("work"),
            frame_interval: 90,
            batch_size: 10,
            keep_intermediate_files: keep,
            ..Default::default()
        };
        ProcessVideoCommand::new(video, "people smiling").with_options(options)
    }

    async fn run_one(
        dir: &Path,
        keep: bool,
    ) -> (PipelineResult, Arc<EventPublisher>, Vec<JobEvent>) {
        let publisher = EventPublisher::new().arc();
        let (tx, rx) = mpsc::channel(4);
        let worker = PipelineWorker::new(
            PipelineWorkerConfig::default(),
            rx,
            coordinator(dir),
            publisher.clone(),
        );
        let handle = tokio::spawn(worker.run());

        let (job, result_rx) = PipelineJob::new(command(dir, keep)).with_reply();
        let job_id = job.job_id.clone();
        let mut events = publisher.register_job(&job_id);
        tx.send(job).await.unwrap();
        drop(tx);

        let result = result_rx.await.unwrap();
        handle.await.unwrap();

        let mut seen = Vec::new();
        while let Ok(event) = events.try_recv() {
            seen.push(event);
        }
        assert!(publisher.latest_status(&job_id).is_some());
        (result, publisher, seen)
    }

    #[tokio::test]
    async fn test_end_to_end_with_external_tools() {
        let temp_dir = tempdir().unwrap();
        let (result, _publisher, events) = run_one(temp_dir.path(), false).await;

        assert!(result.success, "run failed: {:?}", result.error);
        assert_eq!(result.refined_task, "Detect smiling people");

        let work = temp_dir.path().join("work");
        let annotated = result.annotated_video_path.clone().unwrap();
        assert_eq!(annotated, work.join("clip_annotated.mp4"));
        assert_eq!(std::fs::read(&annotated).unwrap(), b"videotranscoded");
        assert!(!work.join("clip_annotated.transcoding.mp4").exists());
        assert_eq!(result.stages.transcode, StageOutcome::Completed);

        // 批大小被限制到上限
        assert_eq!(std::fs::read_to_string(work.join("batch_size.txt")).unwrap(), "3");
        assert_eq!(std::fs::read_to_string(work.join("token.txt")).unwrap(), "hf_test");

        // 帧目录已清理，detections 保留
        assert!(result.detections_path.as_ref().unwrap().exists());
        let leftover_dirs = std::fs::read_dir(&work)
            .unwrap()
            .filter(|e| e.as_ref().unwrap().path().is_dir())
            .count();
        assert_eq!(leftover_dirs, 0);

        let stages: Vec<i32> = events
            .iter()
            .filter_map(|e| match e {
                JobEvent::StatusChanged { event, .. } => Some(event.stage),
                JobEvent::Finished { .. } => None,
            })
            .collect();
        assert!(stages.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(stages.last(), Some(&PipelineStatus::Completed.stage_index()));
        assert!(matches!(events.last(), Some(JobEvent::Finished { .. })));
    }

    #[tokio::test]
    async fn test_keep_intermediate_files_persists_frames() {
        let temp_dir = tempdir().unwrap();
        let (result, _publisher, _events) = run_one(temp_dir.path(), true).await;

        assert!(result.success);
        let frame_dirs: Vec<_> = std::fs::read_dir(temp_dir.path().join("work"))
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| p.is_dir())
            .collect();
        assert_eq!(frame_dirs.len(), 1);
        assert!(frame_dirs[0].join("manifest.json").exists());
    }
}
