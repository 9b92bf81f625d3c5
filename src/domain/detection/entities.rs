//! Detection Context - Entities

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::{AnalysisResult, BoundingBox, DetectionError};

/// 检测到的人
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedPerson {
    pub person_id: u32,
    pub bbox: BoundingBox,
    pub bbox_confidence: f64,
    #[serde(default)]
    pub analysis_result: AnalysisResult,
    #[serde(default)]
    pub visual_description: String,
}

/// 单帧检测结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameDetection {
    pub frame_index: u64,
    #[serde(default)]
    pub frame_filename: Option<String>,
    #[serde(default)]
    pub timestamp_s: Option<f64>,
    pub image_width: u32,
    pub image_height: u32,
    pub people_detected: u32,
    #[serde(default)]
    pub people: Vec<DetectedPerson>,
}

/// 源视频信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoInfo {
    #[serde(default)]
    pub video_path: Option<PathBuf>,
    #[serde(default)]
    pub video_stem: Option<String>,
    pub fps: f64,
    pub total_frames: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

/// 检测结果集
///
/// 每次成功运行产生一份，以 JSON 文件形式持久化
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionSet {
    pub video_info: VideoInfo,
    pub task_description: String,
    #[serde(default)]
    pub frame_detections: Vec<FrameDetection>,
}

impl DetectionSet {
    pub async fn load(path: &Path) -> Result<Self, DetectionError> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| DetectionError::Missing(format!("{}: {}", path.display(), e)))?;
        serde_json::from_str(&raw)
            .map_err(|e| DetectionError::Invalid(format!("{}: {}", path.display(), e)))
    }

    /// 检测帧数不能超过采样帧数
    pub fn ensure_within(&self, saved_count: u64) -> Result<(), DetectionError> {
        let detected = self.frame_detections.len() as u64;
        if detected > saved_count {
            return Err(DetectionError::TooManyFrames {
                detected,
                saved_count,
            });
        }
        Ok(())
    }

    pub fn total_people(&self) -> u64 {
        self.frame_detections
            .iter()
            .map(|f| f.people.len() as u64)
            .sum()
    }
}
