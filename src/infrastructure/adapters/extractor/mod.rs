//! Extractor Adapter - 外部抽帧工具

mod process_frame_extractor;

pub use process_frame_extractor::ProcessFrameExtractor;
