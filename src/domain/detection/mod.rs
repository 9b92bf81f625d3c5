//! Detection Context - 检测结果上下文
//!
//! 职责:
//! - 检测结果集（DetectionSet）JSON 结构
//! - 边界框与分析标签值对象

mod entities;
mod value_objects;

pub use entities::{DetectedPerson, DetectionSet, FrameDetection, VideoInfo};
pub use value_objects::{AnalysisResult, BoundingBox, DetectionKind, DetectionLabel};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DetectionError {
    #[error("detections file not found: {0}")]
    Missing(String),

    #[error("detections file is not valid: {0}")]
    Invalid(String),

    #[error("{detected} frame detections exceed {saved_count} sampled frames")]
    TooManyFrames { detected: u64, saved_count: u64 },
}
