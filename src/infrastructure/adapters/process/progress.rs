//! Progress Parser - 标注进度行解析
//!
//! 支持两种格式:
//! - 文本: `Progress: 45.0% (45/100 frames)`
//! - JSON: `{"progress": {"frame": 45, "total": 100, "percentage": 45.0}}`
//!
//! 其他行一律忽略，不报错

use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;

use crate::application::ports::AnnotationProgress;

static RE_PROGRESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Progress:\s*(\d+(?:\.\d+)?)%\s*\((\d+)/(\d+)\s*frames\)")
        .expect("valid progress regex")
});

#[derive(Deserialize)]
struct ProgressLine {
    progress: ProgressBody,
}

#[derive(Deserialize)]
struct ProgressBody {
    frame: u64,
    total: u64,
    #[serde(default)]
    percentage: Option<f64>,
}

pub fn parse_progress_line(line: &str) -> Option<AnnotationProgress> {
    let line = line.trim();

    if line.starts_with('{') {
        let parsed: ProgressLine = serde_json::from_str(line).ok()?;
        let body = parsed.progress;
        let percentage = body.percentage.unwrap_or_else(|| {
            if body.total == 0 {
                0.0
            } else {
                body.frame as f64 / body.total as f64 * 100.0
            }
        });
        return Some(AnnotationProgress {
            frame_idx: body.frame,
            total_frames: body.total,
            percentage,
        });
    }

    let captures = RE_PROGRESS.captures(line)?;
    Some(AnnotationProgress {
        percentage: captures.get(1)?.as_str().parse().ok()?,
        frame_idx: captures.get(2)?.as_str().parse().ok()?,
        total_frames: captures.get(3)?.as_str().parse().ok()?,
    })
}
