//! Process Frame Analyzer - 调用外部视觉模型分析工具
//!
//! 进程约定:
//! `analyzer <manifest_path> <refined_task> <batch_size>`
//! stdout 报告 detections 文件路径，stderr 仅用于观测

use async_trait::async_trait;
use std::ffi::OsString;

use super::telemetry::TelemetryCollector;
use crate::application::error::{PipelineError, PipelineStage};
use crate::application::ports::{
    clamp_batch_size, AnalyzedFrames, ExtractedFrames, FrameAnalyzerPort,
};
use crate::domain::detection::DetectionSet;
use crate::infrastructure::adapters::process::{find_result_path, run_tool, ToolCommand};

pub struct ProcessFrameAnalyzer {
    tool: ToolCommand,
    /// 传给子进程的凭据环境变量
    child_env: Vec<(String, String)>,
}

impl ProcessFrameAnalyzer {
    pub fn new(tool: ToolCommand, child_env: Vec<(String, String)>) -> Self {
        Self { tool, child_env }
    }
}

#[async_trait]
impl FrameAnalyzerPort for ProcessFrameAnalyzer {
    async fn analyze(
        &self,
        frames: &ExtractedFrames,
        refined_task: &str,
        batch_size: u32,
    ) -> Result<AnalyzedFrames, PipelineError> {
        let capped = clamp_batch_size(batch_size);
        if capped != batch_size {
            tracing::warn!(requested = batch_size, capped, "Batch size clamped");
        }

        let args: Vec<OsString> = vec![
            frames.manifest_path.as_os_str().to_owned(),
            refined_task.into(),
            capped.to_string().into(),
        ];

        tracing::info!(
            session_id = %frames.manifest.session_id,
            frames = frames.manifest.saved_count,
            batch_size = capped,
            "Analyzing frames"
        );

        let mut collector = TelemetryCollector::new();
        let output = run_tool(
            PipelineStage::Analysis,
            &self.tool,
            &args,
            &self.child_env,
            |line| collector.observe(line),
        )
        .await?;
        if !output.success() {
            return Err(output.exit_error(PipelineStage::Analysis, &self.tool));
        }

        let analysis_error = |message: String| {
            PipelineError::stage_failure(PipelineStage::Analysis, message, output.stderr_tail())
        };

        let detections_path = find_result_path(&output.stdout)
            .await
            .ok_or_else(|| analysis_error("analyzer did not report a detections file".to_string()))?;

        let detections = DetectionSet::load(&detections_path)
            .await
            .map_err(|e| analysis_error(e.to_string()))?;
        detections
            .ensure_within(frames.manifest.saved_count)
            .map_err(|e| analysis_error(e.to_string()))?;

        let telemetry = collector.finish();
        tracing::info!(
            detections = %detections_path.display(),
            frames = detections.frame_detections.len(),
            people = detections.total_people(),
            batches = telemetry.batches.len(),
            "Frame analysis complete"
        );

        Ok(AnalyzedFrames {
            detections_path,
            detections,
            batch_size: capped,
            telemetry,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{BatchProvider, ExtractOptions, FrameExtractorPort};
    use crate::infrastructure::adapters::extractor::ProcessFrameExtractor;
    use crate::infrastructure::adapters::process::test_tools;
    use std::path::Path;
    use tempfile::tempdir;

    async fn extract(dir: &Path) -> ExtractedFrames {
        let extractor = ProcessFrameExtractor::new(test_tools::extractor(dir));
        let options = ExtractOptions {
            work_dir: dir.join("work"),
            interval: 90,
            max_frames: None,
            keep_on_failure: false,
        };
        extractor.extract(&dir.join("clip.mp4"), &options).await.unwrap()
    }

    #[tokio::test]
    async fn test_analyze_reads_detections_and_telemetry() {
        let temp_dir = tempdir().unwrap();
        let frames = extract(temp_dir.path()).await;
        let analyzer = ProcessFrameAnalyzer::new(
            test_tools::analyzer(temp_dir.path()),
            vec![("HF_TOKEN".to_string(), "hf_secret".to_string())],
        );

        let analyzed = analyzer.analyze(&frames, "find smiles", 64).await.unwrap();

        assert_eq!(analyzed.batch_size, 3);
        assert_eq!(analyzed.detections.frame_detections.len(), 1);
        assert_eq!(analyzed.detections.task_description, "find smiles");
        assert_eq!(analyzed.detections.total_people(), 1);
        assert_eq!(
            analyzed.detections_path,
            temp_dir.path().join("work").join("clip_detections.json")
        );

        let work = temp_dir.path().join("work");
        assert_eq!(std::fs::read_to_string(work.join("batch_size.txt")).unwrap(), "3");
        assert_eq!(std::fs::read_to_string(work.join("token.txt")).unwrap(), "hf_secret");

        assert_eq!(
            analyzed.telemetry.model.as_deref(),
            Some("Qwen/Qwen2.5-VL-7B-Instruct")
        );
        assert_eq!(analyzed.telemetry.batches.len(), 1);
        assert_eq!(analyzed.telemetry.batches[0].provider, BatchProvider::Primary);
    }

    #[tokio::test]
    async fn test_more_detections_than_frames_is_fatal() {
        let temp_dir = tempdir().unwrap();
        let mut frames = extract(temp_dir.path()).await;
        frames.manifest.saved_count = 0;
        let analyzer = ProcessFrameAnalyzer::new(test_tools::analyzer(temp_dir.path()), vec![]);

        let err = analyzer.analyze(&frames, "find smiles", 2).await.unwrap_err();

        assert!(matches!(err, PipelineError::Analysis { .. }));
    }

    #[tokio::test]
    async fn test_missing_result_path_is_fatal() {
        let temp_dir = tempdir().unwrap();
        let frames = extract(temp_dir.path()).await;
        let tool = test_tools::script(temp_dir.path(), "silent.sh", "echo 'Done.'");
        let analyzer = ProcessFrameAnalyzer::new(tool, vec![]);

        let err = analyzer.analyze(&frames, "find smiles", 2).await.unwrap_err();

        assert!(err.to_string().contains("did not report a detections file"));
    }
}
