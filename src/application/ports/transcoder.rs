//! Transcoder Port - 兼容性转码
//!
//! 输出写到输入旁边的临时文件，由协调器负责替换原文件

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::application::error::PipelineError;

#[async_trait]
pub trait TranscoderPort: Send + Sync {
    /// 重新编码，返回临时文件路径
    async fn reencode(&self, input_path: &Path) -> Result<PathBuf, PipelineError>;
}
