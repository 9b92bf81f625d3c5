//! Pipeline Coordinator - 视频检测流水线编排
//!
//! 顺序执行: 提示词优化 → 抽帧 → 帧分析 → 视频标注 → 转码 → 清理
//!
//! - 每个阶段开始和结束都推送 StatusEvent
//! - 致命错误只在这里捕获一次，转换为 failed 事件和失败结果
//! - 会话帧目录无论成功失败都会清理（除非要求保留）

use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::application::commands::ProcessVideoCommand;
use crate::application::error::{PipelineError, PipelineStage};
use crate::application::ports::{
    AnnotationProgress, ExtractOptions, FrameAnalyzerPort, FrameExtractorPort, PromptRefinerPort,
    RefinementOutcome, StatusCallback, TranscoderPort, VideoAnnotatorPort,
};
use crate::domain::pipeline::{
    PipelineResult, PipelineStatus, StageMarkers, StageOutcome, StatusEvent,
};

/// 单次运行的可变状态
struct RunState {
    refined_task: String,
    stages: StageMarkers,
    frames_dir: Option<PathBuf>,
}

impl RunState {
    fn mark(&mut self, stage: PipelineStage, outcome: StageOutcome) {
        let slot = match stage {
            PipelineStage::Refinement => &mut self.stages.refinement,
            PipelineStage::Extraction => &mut self.stages.extraction,
            PipelineStage::Analysis => &mut self.stages.analysis,
            PipelineStage::Annotation => &mut self.stages.annotation,
            PipelineStage::Transcode => &mut self.stages.transcode,
            PipelineStage::Cleanup => &mut self.stages.cleanup,
        };
        *slot = outcome;
    }
}

/// 成功路径产物
struct StageOutputs {
    detections_path: PathBuf,
    annotated_video_path: Option<PathBuf>,
}

/// 流水线协调器
///
/// 不持有任何运行级状态，多个视频可以并发调用 `process_video`
pub struct PipelineCoordinator {
    refiner: Arc<dyn PromptRefinerPort>,
    extractor: Arc<dyn FrameExtractorPort>,
    analyzer: Arc<dyn FrameAnalyzerPort>,
    annotator: Arc<dyn VideoAnnotatorPort>,
    transcoder: Arc<dyn TranscoderPort>,
}

impl PipelineCoordinator {
    pub fn new(
        refiner: Arc<dyn PromptRefinerPort>,
        extractor: Arc<dyn FrameExtractorPort>,
        analyzer: Arc<dyn FrameAnalyzerPort>,
        annotator: Arc<dyn VideoAnnotatorPort>,
        transcoder: Arc<dyn TranscoderPort>,
    ) -> Self {
        Self {
            refiner,
            extractor,
            analyzer,
            annotator,
            transcoder,
        }
    }

    /// 处理一个视频
    ///
    /// 总是返回结构完整的 `PipelineResult`，错误不会传播给调用方
    pub async fn process_video(
        &self,
        cmd: ProcessVideoCommand,
        status: &dyn StatusCallback,
    ) -> PipelineResult {
        let mut run = RunState {
            refined_task: cmd.task_description.clone(),
            stages: StageMarkers::default(),
            frames_dir: None,
        };

        status.on_status(StatusEvent::new(
            PipelineStatus::Initializing,
            json!({
                "videoPath": cmd.video_path,
                "taskDescription": cmd.task_description,
            }),
        ));

        tracing::info!(
            video = %cmd.video_path.display(),
            skip_refinement = cmd.skip_refinement,
            "Pipeline started"
        );

        match self.run_stages(&cmd, status, &mut run).await {
            Ok(outputs) => self.finish(&cmd, status, run, outputs).await,
            Err(err) => self.fail(&cmd, status, run, err).await,
        }
    }

    async fn run_stages(
        &self,
        cmd: &ProcessVideoCommand,
        status: &dyn StatusCallback,
        run: &mut RunState,
    ) -> Result<StageOutputs, PipelineError> {
        let options = &cmd.options;

        // Stage 0: 提示词优化（不会失败）
        status.on_status(StatusEvent::new(
            PipelineStatus::RefiningPrompt,
            json!({ "phase": "started", "skip": cmd.skip_refinement }),
        ));
        let refined = self
            .refiner
            .refine(&cmd.task_description, cmd.skip_refinement)
            .await;
        run.mark(
            PipelineStage::Refinement,
            match refined.outcome {
                RefinementOutcome::Skipped => StageOutcome::Skipped,
                RefinementOutcome::Refined { .. } => StageOutcome::Completed,
                RefinementOutcome::FellBack { .. } => StageOutcome::Degraded,
            },
        );
        run.refined_task = refined.text;
        status.on_status(StatusEvent::new(
            PipelineStatus::RefiningPrompt,
            json!({
                "phase": "completed",
                "refinedTask": run.refined_task,
                "refinement": refined.outcome,
            }),
        ));

        // Stage 1: 抽帧
        status.on_status(StatusEvent::new(
            PipelineStatus::ExtractingFrames,
            json!({
                "phase": "started",
                "interval": options.frame_interval,
                "maxFrames": options.max_frames,
            }),
        ));
        let extract_options = ExtractOptions {
            work_dir: options.work_dir.clone(),
            interval: options.frame_interval,
            max_frames: options.max_frames,
            keep_on_failure: options.keep_intermediate_files,
        };
        let frames = self
            .extractor
            .extract(&cmd.video_path, &extract_options)
            .await?;
        run.frames_dir = Some(frames.frames_dir.clone());
        run.mark(PipelineStage::Extraction, StageOutcome::Completed);
        status.on_status(StatusEvent::new(
            PipelineStatus::ExtractingFrames,
            json!({
                "phase": "completed",
                "sessionId": frames.manifest.session_id,
                "framesDir": frames.frames_dir,
                "savedCount": frames.manifest.saved_count,
            }),
        ));

        // Stage 2: 帧分析
        status.on_status(StatusEvent::new(
            PipelineStatus::AnalyzingFrames,
            json!({
                "phase": "started",
                "frames": frames.manifest.saved_count,
                "requestedBatchSize": options.batch_size,
            }),
        ));
        let analyzed = self
            .analyzer
            .analyze(&frames, &run.refined_task, options.batch_size)
            .await?;
        run.mark(PipelineStage::Analysis, StageOutcome::Completed);
        status.on_status(StatusEvent::new(
            PipelineStatus::AnalyzingFrames,
            json!({
                "phase": "completed",
                "detectionsPath": analyzed.detections_path,
                "framesAnalyzed": analyzed.detections.frame_detections.len(),
                "peopleDetected": analyzed.detections.total_people(),
                "batchSize": analyzed.batch_size,
                "telemetry": analyzed.telemetry,
            }),
        ));

        // Stage 3: 标注 + 转码
        if !options.annotation_enabled {
            run.mark(PipelineStage::Annotation, StageOutcome::Skipped);
            run.mark(PipelineStage::Transcode, StageOutcome::Skipped);
            status.on_status(StatusEvent::new(
                PipelineStatus::AnnotatingVideo,
                json!({ "phase": "skipped" }),
            ));
            return Ok(StageOutputs {
                detections_path: analyzed.detections_path,
                annotated_video_path: None,
            });
        }

        status.on_status(StatusEvent::new(
            PipelineStatus::AnnotatingVideo,
            json!({ "phase": "started" }),
        ));
        let on_progress = |progress: AnnotationProgress| {
            status.on_status(StatusEvent::new(
                PipelineStatus::AnnotatingVideo,
                json!({ "phase": "progress", "progress": progress }),
            ));
        };
        let annotated = self
            .annotator
            .annotate(
                &cmd.video_path,
                &analyzed.detections_path,
                cmd.output_path.as_deref(),
                &on_progress,
            )
            .await?;
        run.mark(PipelineStage::Annotation, StageOutcome::Completed);

        let transcode = if options.transcode_enabled {
            status.on_status(StatusEvent::new(
                PipelineStatus::AnnotatingVideo,
                json!({ "phase": "transcoding", "input": annotated }),
            ));
            self.transcode_in_place(&annotated).await
        } else {
            StageOutcome::Skipped
        };
        run.mark(PipelineStage::Transcode, transcode);

        status.on_status(StatusEvent::new(
            PipelineStatus::AnnotatingVideo,
            json!({
                "phase": "completed",
                "annotatedVideoPath": annotated,
                "transcode": transcode,
            }),
        ));

        Ok(StageOutputs {
            detections_path: analyzed.detections_path,
            annotated_video_path: Some(annotated),
        })
    }

    /// 转码并替换原文件，任何失败都保留转码前的文件
    async fn transcode_in_place(&self, annotated: &Path) -> StageOutcome {
        let temp_path = match self.transcoder.reencode(annotated).await {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!(
                    input = %annotated.display(),
                    error = %e,
                    "Transcode failed, keeping original annotated video"
                );
                return StageOutcome::Degraded;
            }
        };

        // 同一目录内 rename 会原子替换原文件
        match tokio::fs::rename(&temp_path, annotated).await {
            Ok(()) => {
                tracing::info!(output = %annotated.display(), "Annotated video transcoded");
                StageOutcome::Completed
            }
            Err(e) => {
                tracing::warn!(
                    temp = %temp_path.display(),
                    error = %e,
                    "Failed to swap transcoded video into place"
                );
                if let Err(e) = tokio::fs::remove_file(&temp_path).await {
                    tracing::debug!(error = %e, "Failed to remove transcode temp file");
                }
                StageOutcome::Degraded
            }
        }
    }

    async fn finish(
        &self,
        cmd: &ProcessVideoCommand,
        status: &dyn StatusCallback,
        mut run: RunState,
        outputs: StageOutputs,
    ) -> PipelineResult {
        // Stage 4: 清理
        status.on_status(StatusEvent::new(
            PipelineStatus::CleaningUp,
            json!({ "phase": "started", "keepIntermediateFiles": cmd.options.keep_intermediate_files }),
        ));
        let cleanup = self.cleanup(cmd, &run).await;
        run.mark(PipelineStage::Cleanup, cleanup);
        status.on_status(StatusEvent::new(
            PipelineStatus::CleaningUp,
            json!({ "phase": "completed", "cleanup": cleanup }),
        ));

        let result = PipelineResult::succeeded(
            run.refined_task,
            outputs.detections_path,
            outputs.annotated_video_path,
            run.stages,
        );

        status.on_status(StatusEvent::new(
            PipelineStatus::Completed,
            json!({
                "detectionsPath": result.detections_path,
                "annotatedVideoPath": result.annotated_video_path,
                "stages": result.stages,
            }),
        ));

        tracing::info!(
            video = %cmd.video_path.display(),
            annotated = ?result.annotated_video_path,
            "Pipeline completed"
        );

        result
    }

    async fn fail(
        &self,
        cmd: &ProcessVideoCommand,
        status: &dyn StatusCallback,
        mut run: RunState,
        err: PipelineError,
    ) -> PipelineResult {
        let stage = err.stage();
        run.mark(stage, StageOutcome::Failed);

        tracing::error!(
            video = %cmd.video_path.display(),
            stage = %stage,
            error = %err,
            "Pipeline failed"
        );

        let cleanup = self.cleanup(cmd, &run).await;
        run.mark(PipelineStage::Cleanup, cleanup);

        let message = err.to_string();
        status.on_status(StatusEvent::failed(&message, Some(stage.as_str())));

        PipelineResult::failed(run.refined_task, run.stages, message, Some(err.chain()))
    }

    /// 删除会话帧目录，失败不影响结果
    async fn cleanup(&self, cmd: &ProcessVideoCommand, run: &RunState) -> StageOutcome {
        let Some(frames_dir) = run.frames_dir.as_ref() else {
            return StageOutcome::Skipped;
        };
        if cmd.options.keep_intermediate_files {
            tracing::debug!(dir = %frames_dir.display(), "Keeping intermediate frames");
            return StageOutcome::Skipped;
        }

        match remove_dir_if_exists(frames_dir).await {
            Ok(()) => StageOutcome::Completed,
            Err(e) => {
                tracing::warn!(error = %e, "Cleanup failed");
                StageOutcome::Degraded
            }
        }
    }
}

async fn remove_dir_if_exists(dir: &Path) -> Result<(), PipelineError> {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => {
            tracing::debug!(dir = %dir.display(), "Frames directory removed");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(PipelineError::Cleanup {
            path: dir.display().to_string(),
            source,
        }),
    }
}
