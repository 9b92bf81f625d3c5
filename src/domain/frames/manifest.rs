//! Frames Context - Manifest

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::FramesError;

/// 抽帧工具写出的清单文件名
pub const MANIFEST_FILE_NAME: &str = "manifest.json";

/// 单个采样帧
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameEntry {
    #[serde(alias = "frame_index")]
    pub index: u64,
    pub filename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_frame_number: Option<u64>,
    #[serde(default, alias = "timestamp")]
    pub timestamp_s: f64,
}

/// 帧清单
///
/// 不变量:
/// - `saved_count == frames.len()`
/// - `saved_count <= min(max_frames, total_frames / interval + 1)`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameManifest {
    /// 会话 ID，由抽帧适配器加载后填入
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub video_path: Option<PathBuf>,
    #[serde(default)]
    pub video_stem: Option<String>,
    #[serde(default, alias = "frames_dir")]
    pub output_dir: Option<PathBuf>,
    #[serde(default)]
    pub fps: f64,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub total_frames: Option<u64>,
    #[serde(default)]
    pub duration_s: f64,
    #[serde(default)]
    pub frame_interval: Option<u32>,
    pub saved_count: u64,
    #[serde(default)]
    pub frames: Vec<FrameEntry>,
}

impl FrameManifest {
    /// 读取并解析清单
    pub async fn load(path: &Path) -> Result<Self, FramesError> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| FramesError::ManifestMissing(format!("{}: {}", path.display(), e)))?;
        serde_json::from_str(&raw)
            .map_err(|e| FramesError::ManifestInvalid(format!("{}: {}", path.display(), e)))
    }

    /// 校验采样数量
    pub fn validate(&self, interval: u32, max_frames: Option<u32>) -> Result<(), FramesError> {
        if self.saved_count != self.frames.len() as u64 {
            return Err(FramesError::CountMismatch {
                saved_count: self.saved_count,
                listed: self.frames.len(),
            });
        }

        if let Some(limit) = self.sampling_limit(interval, max_frames) {
            if self.saved_count > limit {
                return Err(FramesError::TooManyFrames {
                    saved_count: self.saved_count,
                    limit,
                });
            }
        }

        Ok(())
    }

    /// 允许的最大采样数，两个上限都未知时返回 None
    pub fn sampling_limit(&self, interval: u32, max_frames: Option<u32>) -> Option<u64> {
        let by_interval = self
            .total_frames
            .map(|total| total / u64::from(interval.max(1)) + 1);
        match (by_interval, max_frames) {
            (Some(a), Some(b)) => Some(a.min(u64::from(b))),
            (Some(a), None) => Some(a),
            (None, Some(b)) => Some(u64::from(b)),
            (None, None) => None,
        }
    }

    pub fn frame_by_index(&self, index: u64) -> Option<&FrameEntry> {
        self.frames.iter().find(|f| f.index == index)
    }
}
