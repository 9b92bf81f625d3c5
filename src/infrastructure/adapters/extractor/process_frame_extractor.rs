//! Process Frame Extractor - 调用外部抽帧工具
//!
//! 进程约定:
//! `extractor <video_path> <output_dir> <interval> [max_frames]`
//! 成功退出后 `output_dir/manifest.json` 必须存在

use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::application::error::{PipelineError, PipelineStage};
use crate::application::ports::{ExtractOptions, ExtractedFrames, FrameExtractorPort};
use crate::domain::frames::{FrameManifest, MANIFEST_FILE_NAME};
use crate::infrastructure::adapters::process::{run_tool, ToolCommand};

/// 抽帧适配器
pub struct ProcessFrameExtractor {
    tool: ToolCommand,
}

impl ProcessFrameExtractor {
    pub fn new(tool: ToolCommand) -> Self {
        Self { tool }
    }

    /// 会话 ID：`<视频文件名>_<uuid>`，保证并发运行互不干扰
    fn new_session_id(video_path: &Path) -> String {
        let stem = video_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "video".to_string());
        format!("{}_{}", stem, Uuid::new_v4().simple())
    }

    async fn run(
        &self,
        video_path: &Path,
        frames_dir: &Path,
        session_id: &str,
        options: &ExtractOptions,
    ) -> Result<ExtractedFrames, PipelineError> {
        let mut args: Vec<OsString> = vec![
            video_path.as_os_str().to_owned(),
            frames_dir.as_os_str().to_owned(),
            options.interval.to_string().into(),
        ];
        if let Some(max_frames) = options.max_frames {
            args.push(max_frames.to_string().into());
        }

        let output = run_tool(PipelineStage::Extraction, &self.tool, &args, &[], |_| {}).await?;
        if !output.success() {
            return Err(output.exit_error(PipelineStage::Extraction, &self.tool));
        }

        let manifest_path = frames_dir.join(MANIFEST_FILE_NAME);
        let mut manifest = FrameManifest::load(&manifest_path).await.map_err(|e| {
            PipelineError::stage_failure(PipelineStage::Extraction, e.to_string(), output.stderr_tail())
        })?;
        manifest
            .validate(options.interval, options.max_frames)
            .map_err(|e| {
                PipelineError::stage_failure(
                    PipelineStage::Extraction,
                    e.to_string(),
                    output.stderr_tail(),
                )
            })?;

        manifest.session_id = session_id.to_string();
        if manifest.output_dir.is_none() {
            manifest.output_dir = Some(frames_dir.to_path_buf());
        }

        tracing::info!(
            session_id = %session_id,
            saved_count = manifest.saved_count,
            total_frames = ?manifest.total_frames,
            fps = manifest.fps,
            "Frames extracted"
        );

        Ok(ExtractedFrames {
            manifest,
            manifest_path,
            frames_dir: frames_dir.to_path_buf(),
        })
    }
}

#[async_trait]
impl FrameExtractorPort for ProcessFrameExtractor {
    async fn extract(
        &self,
        video_path: &Path,
        options: &ExtractOptions,
    ) -> Result<ExtractedFrames, PipelineError> {
        let session_id = Self::new_session_id(video_path);
        let frames_dir: PathBuf = options.work_dir.join(&session_id);

        tokio::fs::create_dir_all(&frames_dir).await.map_err(|e| {
            PipelineError::stage_failure(
                PipelineStage::Extraction,
                format!("cannot create frames directory {}: {}", frames_dir.display(), e),
                "",
            )
        })?;

        tracing::debug!(
            video = %video_path.display(),
            frames_dir = %frames_dir.display(),
            interval = options.interval,
            max_frames = ?options.max_frames,
            "Extracting frames"
        );

        let result = self.run(video_path, &frames_dir, &session_id, options).await;

        if result.is_err() && !options.keep_on_failure {
            if let Err(e) = tokio::fs::remove_dir_all(&frames_dir).await {
                tracing::debug!(error = %e, "Failed to remove partial frames directory");
            }
        }

        result
    }
}
