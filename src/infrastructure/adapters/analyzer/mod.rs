//! Analyzer Adapter - 外部视觉模型分析工具

mod process_frame_analyzer;
mod telemetry;

pub use process_frame_analyzer::ProcessFrameAnalyzer;
pub use telemetry::TelemetryCollector;
