//! 应用层 - 命令（写操作）
//!
//! 视频检测流水线命令与协调器

mod process_video_commands;

pub mod handlers;

pub use process_video_commands::*;
