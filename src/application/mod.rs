//! 应用层 - 用例编排
//!
//! 包含：
//! - ports: 六边形架构端口定义（PromptRefiner、FrameExtractor、FrameAnalyzer、VideoAnnotator、Transcoder 等）
//! - commands: 处理视频命令及流水线协调器
//! - error: 流水线错误定义

pub mod commands;
pub mod error;
pub mod ports;

// Re-exports
pub use commands::{handlers::PipelineCoordinator, PipelineOptions, ProcessVideoCommand};

pub use error::{PipelineError, PipelineStage};

pub use ports::{
    // Chat completion
    ChatCompletionPort,
    ChatError,
    ChatMessage,
    ChatRequest,
    ChatResponse,
    // Pipeline stages
    FrameAnalyzerPort,
    FrameExtractorPort,
    PromptRefinerPort,
    TranscoderPort,
    VideoAnnotatorPort,
    // Status
    StatusCallback,
};
