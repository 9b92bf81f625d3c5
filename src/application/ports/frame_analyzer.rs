//! Frame Analyzer Port - 批量视觉模型推理

use async_trait::async_trait;
use serde::Serialize;
use std::path::PathBuf;

use crate::application::error::PipelineError;
use crate::application::ports::ExtractedFrames;
use crate::domain::detection::DetectionSet;

/// 单批次推理的最大图片数，防止请求过大
pub const MAX_ANALYSIS_BATCH_SIZE: u32 = 3;

/// 把批大小限制在 1..=MAX_ANALYSIS_BATCH_SIZE
pub fn clamp_batch_size(requested: u32) -> u32 {
    requested.clamp(1, MAX_ANALYSIS_BATCH_SIZE)
}

/// 批次由哪个 provider 完成
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchProvider {
    Primary,
    Fallback,
    Failed,
}

/// 单批次记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchRecord {
    pub batch: u32,
    pub provider: BatchProvider,
}

/// 从分析进程 stderr 解析出的观测信息，不影响控制流
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzerTelemetry {
    pub model: Option<String>,
    pub fallback_model: Option<String>,
    pub total_batches: Option<u32>,
    pub batches: Vec<BatchRecord>,
}

/// 分析结果
#[derive(Debug, Clone)]
pub struct AnalyzedFrames {
    pub detections_path: PathBuf,
    pub detections: DetectionSet,
    pub batch_size: u32,
    pub telemetry: AnalyzerTelemetry,
}

#[async_trait]
pub trait FrameAnalyzerPort: Send + Sync {
    async fn analyze(
        &self,
        frames: &ExtractedFrames,
        refined_task: &str,
        batch_size: u32,
    ) -> Result<AnalyzedFrames, PipelineError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_batch_size() {
        assert_eq!(clamp_batch_size(0), 1);
        assert_eq!(clamp_batch_size(2), 2);
        assert_eq!(clamp_batch_size(64), MAX_ANALYSIS_BATCH_SIZE);
    }
}
