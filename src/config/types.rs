//! Configuration Types
//!
//! 定义所有配置结构体

use serde::Deserialize;
use std::path::PathBuf;

use crate::application::commands::PipelineOptions;
use crate::infrastructure::adapters::{ToolCommand, TranscodeProfile};

/// 应用主配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// 流水线默认参数
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// 外部工具
    #[serde(default)]
    pub tools: ToolsConfig,

    /// 转码参数
    #[serde(default)]
    pub transcode: TranscodeProfile,

    /// 文本生成服务
    #[serde(default)]
    pub llm: LlmConfig,

    /// Worker 配置
    #[serde(default)]
    pub worker: WorkerConfig,

    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

/// 流水线配置
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// 工作根目录
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,

    /// 每隔 N 帧采样一次
    #[serde(default = "default_frame_interval")]
    pub frame_interval: u32,

    /// 最多采样帧数，不设置则不限制
    #[serde(default)]
    pub max_frames: Option<u32>,

    /// 推理批大小（上限 3）
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,

    #[serde(default)]
    pub keep_intermediate_files: bool,

    #[serde(default = "default_true")]
    pub annotation_enabled: bool,

    #[serde(default = "default_true")]
    pub transcode_enabled: bool,
}

fn default_work_dir() -> PathBuf {
    PathBuf::from("data/work")
}

fn default_frame_interval() -> u32 {
    30
}

fn default_batch_size() -> u32 {
    2
}

fn default_true() -> bool {
    true
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            work_dir: default_work_dir(),
            frame_interval: default_frame_interval(),
            max_frames: None,
            batch_size: default_batch_size(),
            keep_intermediate_files: false,
            annotation_enabled: true,
            transcode_enabled: true,
        }
    }
}

impl PipelineConfig {
    pub fn to_pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            work_dir: self.work_dir.clone(),
            frame_interval: self.frame_interval,
            max_frames: self.max_frames,
            batch_size: self.batch_size,
            keep_intermediate_files: self.keep_intermediate_files,
            annotation_enabled: self.annotation_enabled,
            transcode_enabled: self.transcode_enabled,
        }
    }
}

/// 外部工具配置
///
/// 每个工具是 `{ program, args }`，运行时位置参数追加在 args 之后
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub extractor: ToolCommand,
    pub analyzer: ToolCommand,
    pub annotator: ToolCommand,
    pub encoder: ToolCommand,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            extractor: ToolCommand::new("python3").with_args(["scripts/video_extractor.py"]),
            analyzer: ToolCommand::new("python3").with_args(["scripts/frame_analyzer.py"]),
            annotator: ToolCommand::new("python3").with_args(["scripts/video_annotator.py"]),
            encoder: ToolCommand::new("ffmpeg"),
        }
    }
}

/// 文本生成 provider 配置
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    /// provider 名称（日志和结果中使用）
    pub name: String,

    /// OpenAI 兼容接口的基础 URL
    pub base_url: String,

    /// API Key，未设置时从 `credential_env` 读取
    #[serde(default)]
    pub api_key: Option<String>,

    pub model: String,

    /// 凭据环境变量名，同时用于把凭据传给分析进程
    pub credential_env: String,
}

impl ProviderConfig {
    pub fn huggingface() -> Self {
        Self {
            name: "huggingface".to_string(),
            base_url: "https://router.huggingface.co/v1".to_string(),
            api_key: None,
            model: "Qwen/Qwen2.5-VL-7B-Instruct".to_string(),
            credential_env: "HF_TOKEN".to_string(),
        }
    }

    pub fn openrouter() -> Self {
        Self {
            name: "openrouter".to_string(),
            base_url: "https://openrouter.ai/api/v1".to_string(),
            api_key: None,
            model: "qwen/qwen2.5-vl-72b-instruct".to_string(),
            credential_env: "OPEN_ROUTER_API_KEY".to_string(),
        }
    }

    pub fn has_credentials(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }
}

/// LLM 配置
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "ProviderConfig::huggingface")]
    pub primary: ProviderConfig,

    /// 备用 provider，只有凭据可用时才启用
    #[serde(default = "ProviderConfig::openrouter")]
    pub fallback: ProviderConfig,

    /// 提示词优化使用的模型，不设置则用 provider 默认模型
    #[serde(default)]
    pub refine_model: Option<String>,

    /// 请求超时时间（秒）
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_llm_timeout() -> u64 {
    60
}

fn default_max_tokens() -> u32 {
    256
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            primary: ProviderConfig::huggingface(),
            fallback: ProviderConfig::openrouter(),
            refine_model: None,
            timeout_secs: default_llm_timeout(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl LlmConfig {
    /// 传给分析进程的凭据环境变量
    pub fn child_env(&self) -> Vec<(String, String)> {
        [&self.primary, &self.fallback]
            .into_iter()
            .filter_map(|p| {
                p.api_key
                    .as_ref()
                    .filter(|k| !k.is_empty())
                    .map(|k| (p.credential_env.clone(), k.clone()))
            })
            .collect()
    }
}

/// Worker 配置
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerConfig {
    /// 最大并发流水线数
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// 任务队列容量
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_max_concurrent() -> usize {
    2
}

fn default_queue_capacity() -> usize {
    100
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 是否启用 JSON 格式
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.pipeline.frame_interval, 30);
        assert_eq!(config.pipeline.batch_size, 2);
        assert_eq!(config.worker.max_concurrent, 2);
        assert_eq!(config.tools.encoder.program, "ffmpeg");
        assert_eq!(config.llm.primary.credential_env, "HF_TOKEN");
    }

    #[test]
    fn test_pipeline_options_mirror_config() {
        let mut config = PipelineConfig::default();
        config.max_frames = Some(12);
        config.transcode_enabled = false;

        let options = config.to_pipeline_options();
        assert_eq!(options.max_frames, Some(12));
        assert!(!options.transcode_enabled);
        assert_eq!(options.work_dir, PathBuf::from("data/work"));
    }

    #[test]
    fn test_child_env_only_includes_set_credentials() {
        let mut llm = LlmConfig::default();
        assert!(llm.child_env().is_empty());

        llm.primary.api_key = Some("hf_123".to_string());
        llm.fallback.api_key = Some(String::new());
        assert_eq!(
            llm.child_env(),
            vec![("HF_TOKEN".to_string(), "hf_123".to_string())]
        );
    }
}
