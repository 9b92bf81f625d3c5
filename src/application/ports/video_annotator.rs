//! Video Annotator Port - 视频标注

use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::application::error::PipelineError;

/// 标注进度
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationProgress {
    pub frame_idx: u64,
    pub total_frames: u64,
    pub percentage: f64,
}

/// 进度回调
pub type ProgressFn<'a> = &'a (dyn Fn(AnnotationProgress) + Send + Sync);

/// 默认输出路径：`<detections 所在目录>/<视频文件名>_annotated.mp4`
///
/// 同名视频并发运行会写同一路径，文件名唯一性由上游保证
pub fn default_annotated_path(video_path: &Path, detections_path: &Path) -> PathBuf {
    let stem = video_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "video".to_string());
    let dir = detections_path.parent().unwrap_or_else(|| Path::new("."));
    dir.join(format!("{}_annotated.mp4", stem))
}

#[async_trait]
pub trait VideoAnnotatorPort: Send + Sync {
    async fn annotate(
        &self,
        video_path: &Path,
        detections_path: &Path,
        output_path: Option<&Path>,
        on_progress: ProgressFn<'_>,
    ) -> Result<PathBuf, PipelineError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_annotated_path() {
        let path = default_annotated_path(
            Path::new("/uploads/clip-123.mp4"),
            Path::new("/work/clip-123_detections.json"),
        );
        assert_eq!(path, PathBuf::from("/work/clip-123_annotated.mp4"));
    }
}
