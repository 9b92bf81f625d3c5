//! Annotator Adapter - 外部视频标注工具

mod process_video_annotator;

pub use process_video_annotator::ProcessVideoAnnotator;
