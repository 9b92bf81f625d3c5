//! Pipeline Context - Result

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 单个阶段的结局
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageOutcome {
    /// 尚未执行（失败后的后续阶段）
    #[default]
    Pending,
    Completed,
    /// 按配置跳过
    Skipped,
    /// 失败但已降级处理（提示词回退、转码保留原文件、清理失败）
    Degraded,
    Failed,
}

/// 各阶段完成标记
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageMarkers {
    pub refinement: StageOutcome,
    pub extraction: StageOutcome,
    pub analysis: StageOutcome,
    pub annotation: StageOutcome,
    pub transcode: StageOutcome,
    pub cleanup: StageOutcome,
}

/// 流水线最终结果
///
/// 终态且不可变，任何失败都被折叠成 `success == false`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotated_video_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detections_path: Option<PathBuf>,
    pub refined_task: String,
    pub stages: StageMarkers,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

impl PipelineResult {
    pub fn succeeded(
        refined_task: String,
        detections_path: PathBuf,
        annotated_video_path: Option<PathBuf>,
        stages: StageMarkers,
    ) -> Self {
        Self {
            success: true,
            annotated_video_path,
            detections_path: Some(detections_path),
            refined_task,
            stages,
            error: None,
            stack: None,
        }
    }

    pub fn failed(
        refined_task: String,
        stages: StageMarkers,
        error: String,
        stack: Option<String>,
    ) -> Self {
        Self {
            success: false,
            annotated_video_path: None,
            detections_path: None,
            refined_task,
            stages,
            error: Some(error),
            stack,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_result_omits_paths() {
        let result = PipelineResult::failed(
            "detect people".to_string(),
            StageMarkers::default(),
            "boom".to_string(),
            None,
        );
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["success"], false);
        assert!(json.get("annotatedVideoPath").is_none());
        assert_eq!(json["refinedTask"], "detect people");
        assert_eq!(json["stages"]["annotation"], "pending");
    }
}
