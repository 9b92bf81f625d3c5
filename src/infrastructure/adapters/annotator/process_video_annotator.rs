//! Process Video Annotator - 调用外部标注工具
//!
//! 进程约定:
//! `annotator <video_path> <detections_path> <output_path>`
//! stderr 中的进度行转成 AnnotationProgress 回调

use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::application::error::{PipelineError, PipelineStage};
use crate::application::ports::{default_annotated_path, ProgressFn, VideoAnnotatorPort};
use crate::infrastructure::adapters::process::{find_result_path, parse_progress_line, run_tool, ToolCommand};

pub struct ProcessVideoAnnotator {
    tool: ToolCommand,
}

impl ProcessVideoAnnotator {
    pub fn new(tool: ToolCommand) -> Self {
        Self { tool }
    }
}

#[async_trait]
impl VideoAnnotatorPort for ProcessVideoAnnotator {
    async fn annotate(
        &self,
        video_path: &Path,
        detections_path: &Path,
        output_path: Option<&Path>,
        on_progress: ProgressFn<'_>,
    ) -> Result<PathBuf, PipelineError> {
        let output_path = output_path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| default_annotated_path(video_path, detections_path));

        if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                PipelineError::stage_failure(
                    PipelineStage::Annotation,
                    format!("cannot create output directory {}: {}", parent.display(), e),
                    "",
                )
            })?;
        }

        let args: Vec<OsString> = vec![
            video_path.as_os_str().to_owned(),
            detections_path.as_os_str().to_owned(),
            output_path.as_os_str().to_owned(),
        ];

        let output = run_tool(PipelineStage::Annotation, &self.tool, &args, &[], |line| {
            if let Some(progress) = parse_progress_line(line) {
                on_progress(progress);
            }
        })
        .await?;
        if !output.success() {
            return Err(output.exit_error(PipelineStage::Annotation, &self.tool));
        }

        // 工具报告的路径优先，否则使用约定的输出路径
        let annotated = find_result_path(&output.stdout)
            .await
            .unwrap_or(output_path);

        if !tokio::fs::try_exists(&annotated).await.unwrap_or(false) {
            return Err(PipelineError::stage_failure(
                PipelineStage::Annotation,
                format!("annotated video not found at {}", annotated.display()),
                output.stderr_tail(),
            ));
        }

        tracing::info!(output = %annotated.display(), "Video annotated");
        Ok(annotated)
    }
}
