//! Pipeline Context - Status

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 流水线状态
///
/// 成功路径严格顺序推进，任意状态都可以转到 `Failed`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    Initializing,
    RefiningPrompt,
    ExtractingFrames,
    AnalyzingFrames,
    AnnotatingVideo,
    CleaningUp,
    Completed,
    Failed,
}

impl PipelineStatus {
    /// 阶段序号，失败为 -1
    pub fn stage_index(&self) -> i32 {
        match self {
            PipelineStatus::Initializing | PipelineStatus::RefiningPrompt => 0,
            PipelineStatus::ExtractingFrames => 1,
            PipelineStatus::AnalyzingFrames => 2,
            PipelineStatus::AnnotatingVideo => 3,
            PipelineStatus::CleaningUp => 4,
            PipelineStatus::Completed => 5,
            PipelineStatus::Failed => -1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStatus::Initializing => "initializing",
            PipelineStatus::RefiningPrompt => "refining_prompt",
            PipelineStatus::ExtractingFrames => "extracting_frames",
            PipelineStatus::AnalyzingFrames => "analyzing_frames",
            PipelineStatus::AnnotatingVideo => "annotating_video",
            PipelineStatus::CleaningUp => "cleaning_up",
            PipelineStatus::Completed => "completed",
            PipelineStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineStatus::Completed | PipelineStatus::Failed)
    }
}

impl std::fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 状态事件
///
/// 只推送给调用方提供的回调，核心不做存储
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusEvent {
    pub status: PipelineStatus,
    pub stage: i32,
    pub timestamp: DateTime<Utc>,
    pub details: Value,
}

impl StatusEvent {
    pub fn new(status: PipelineStatus, details: Value) -> Self {
        Self {
            status,
            stage: status.stage_index(),
            timestamp: Utc::now(),
            details,
        }
    }

    /// 失败事件，details 中带上错误信息
    pub fn failed(error: &str, stage: Option<&str>) -> Self {
        Self::new(
            PipelineStatus::Failed,
            serde_json::json!({ "error": error, "failedStage": stage }),
        )
    }
}
