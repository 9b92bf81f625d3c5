//! Application Ports - 出站端口定义
//!
//! 定义应用层与基础设施层的抽象接口

mod chat_completion;
mod frame_analyzer;
mod frame_extractor;
mod prompt_refiner;
mod status_callback;
mod transcoder;
mod video_annotator;

pub use chat_completion::{ChatCompletionPort, ChatError, ChatMessage, ChatRequest, ChatResponse};
pub use frame_analyzer::{
    clamp_batch_size, AnalyzedFrames, AnalyzerTelemetry, BatchProvider, BatchRecord,
    FrameAnalyzerPort, MAX_ANALYSIS_BATCH_SIZE,
};
pub use frame_extractor::{ExtractOptions, ExtractedFrames, FrameExtractorPort};
pub use prompt_refiner::{PromptRefinerPort, RefinedPrompt, RefinementOutcome};
pub use status_callback::StatusCallback;
pub use transcoder::TranscoderPort;
pub use video_annotator::{
    default_annotated_path, AnnotationProgress, ProgressFn, VideoAnnotatorPort,
};
