//! 应用层错误定义
//!
//! 流水线各阶段统一的错误类型，携带阶段上下文和捕获到的 stderr

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 流水线阶段（用于错误上下文和日志）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Refinement,
    Extraction,
    Analysis,
    Annotation,
    Transcode,
    Cleanup,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Refinement => "refinement",
            PipelineStage::Extraction => "extraction",
            PipelineStage::Analysis => "analysis",
            PipelineStage::Annotation => "annotation",
            PipelineStage::Transcode => "transcode",
            PipelineStage::Cleanup => "cleanup",
        }
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 流水线错误
#[derive(Debug, Error)]
pub enum PipelineError {
    /// 提示词优化失败（降级为原始输入）
    #[error("Prompt refinement failed: {0}")]
    Refinement(String),

    /// 抽帧失败
    #[error("Frame extraction failed: {message}{}", stderr_suffix(.stderr))]
    Extraction { message: String, stderr: String },

    /// 帧分析失败
    #[error("Frame analysis failed: {message}{}", stderr_suffix(.stderr))]
    Analysis { message: String, stderr: String },

    /// 视频标注失败
    #[error("Video annotation failed: {message}{}", stderr_suffix(.stderr))]
    Annotation { message: String, stderr: String },

    /// 转码失败（保留转码前的文件）
    #[error("Transcode failed: {message}{}", stderr_suffix(.stderr))]
    Transcode { message: String, stderr: String },

    /// 清理失败（仅记录日志）
    #[error("Cleanup failed for {path}: {source}")]
    Cleanup {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// 外部进程无法启动
    #[error("Failed to start `{program}` for {stage}: {source} (is it installed and on PATH?)")]
    ProcessSpawn {
        stage: PipelineStage,
        program: String,
        #[source]
        source: std::io::Error,
    },
}

fn stderr_suffix(stderr: &str) -> String {
    if stderr.trim().is_empty() {
        String::new()
    } else {
        format!("\nstderr:\n{}", stderr.trim_end())
    }
}

impl PipelineError {
    /// 按阶段构造进程失败错误
    pub fn stage_failure(
        stage: PipelineStage,
        message: impl Into<String>,
        stderr: impl Into<String>,
    ) -> Self {
        let message = message.into();
        let stderr = stderr.into();
        match stage {
            PipelineStage::Refinement => Self::Refinement(message),
            PipelineStage::Extraction => Self::Extraction { message, stderr },
            PipelineStage::Analysis => Self::Analysis { message, stderr },
            PipelineStage::Annotation => Self::Annotation { message, stderr },
            PipelineStage::Transcode | PipelineStage::Cleanup => {
                Self::Transcode { message, stderr }
            }
        }
    }

    pub fn stage(&self) -> PipelineStage {
        match self {
            PipelineError::Refinement(_) => PipelineStage::Refinement,
            PipelineError::Extraction { .. } => PipelineStage::Extraction,
            PipelineError::Analysis { .. } => PipelineStage::Analysis,
            PipelineError::Annotation { .. } => PipelineStage::Annotation,
            PipelineError::Transcode { .. } => PipelineStage::Transcode,
            PipelineError::Cleanup { .. } => PipelineStage::Cleanup,
            PipelineError::ProcessSpawn { stage, .. } => *stage,
        }
    }

    /// 是否终止流水线
    ///
    /// 进程无法启动时按所在阶段判断，转码器缺失不终止
    pub fn is_fatal(&self) -> bool {
        match self {
            PipelineError::Extraction { .. }
            | PipelineError::Analysis { .. }
            | PipelineError::Annotation { .. } => true,
            PipelineError::ProcessSpawn { stage, .. } => matches!(
                stage,
                PipelineStage::Extraction | PipelineStage::Analysis | PipelineStage::Annotation
            ),
            PipelineError::Refinement(_)
            | PipelineError::Transcode { .. }
            | PipelineError::Cleanup { .. } => false,
        }
    }

    /// 错误链，作为结果中的 `stack`
    pub fn chain(&self) -> String {
        let mut lines = vec![format!("[{}] {}", self.stage(), self)];
        let mut source = std::error::Error::source(self);
        while let Some(err) = source {
            lines.push(format!("caused by: {}", err));
            source = err.source();
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_annotation_error_includes_stderr() {
        let err = PipelineError::stage_failure(
            PipelineStage::Annotation,
            "annotator exited with status 2",
            "Error: Detections file not found",
        );
        let text = err.to_string();
        assert!(text.contains("exited with status 2"));
        assert!(text.contains("Detections file not found"));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_spawn_error_names_program() {
        let err = PipelineError::ProcessSpawn {
            stage: PipelineStage::Analysis,
            program: "python3".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "No such file"),
        };
        assert!(err.to_string().contains("`python3`"));
        assert!(err.is_fatal());
        assert!(err.chain().contains("caused by: No such file"));
    }

    #[test]
    fn test_non_fatal_stages() {
        let spawn = PipelineError::ProcessSpawn {
            stage: PipelineStage::Transcode,
            program: "ffmpeg".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };
        assert!(!spawn.is_fatal());
        assert!(!PipelineError::Refinement("quota".to_string()).is_fatal());
    }
}
