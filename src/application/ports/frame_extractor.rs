//! Frame Extractor Port - 视频抽帧

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::application::error::PipelineError;
use crate::domain::frames::FrameManifest;

/// 抽帧参数
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// 工作根目录，会话目录建在其下
    pub work_dir: PathBuf,
    /// 每隔 N 帧采样一次
    pub interval: u32,
    pub max_frames: Option<u32>,
    /// 失败时保留已生成的会话目录
    pub keep_on_failure: bool,
}

/// 抽帧结果
#[derive(Debug, Clone)]
pub struct ExtractedFrames {
    pub manifest: FrameManifest,
    pub manifest_path: PathBuf,
    /// 会话级帧目录，清理阶段删除
    pub frames_dir: PathBuf,
}

#[async_trait]
pub trait FrameExtractorPort: Send + Sync {
    async fn extract(
        &self,
        video_path: &Path,
        options: &ExtractOptions,
    ) -> Result<ExtractedFrames, PipelineError>;
}
