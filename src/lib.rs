//! Framewatch - 视频人物检测流水线
//!
//! 架构设计: Hexagonal Architecture
//!
//! 领域层 (domain/):
//! - Pipeline: 状态事件、阶段标记、运行结果
//! - Frames: 抽帧 manifest
//! - Detection: 检测结果（人物、边框、分析标签）
//!
//! 应用层 (application/):
//! - Ports: 端口定义（PromptRefiner, FrameExtractor, FrameAnalyzer, VideoAnnotator, Transcoder, ChatCompletion）
//! - Commands: ProcessVideoCommand 与 PipelineCoordinator
//!
//! 基础设施层 (infrastructure/):
//! - Adapters: 外部进程工具、LLM 客户端、提示词优化、ffmpeg 转码
//! - Events: 任务状态事件发布
//! - Worker: PipelineWorker 并发执行

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::{load_config, AppConfig};
