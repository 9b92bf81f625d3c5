//! Frames Context - 帧采样上下文
//!
//! 职责:
//! - 帧清单的解析与校验

mod errors;
mod manifest;

pub use errors::FramesError;
pub use manifest::{FrameEntry, FrameManifest, MANIFEST_FILE_NAME};
