//! Chat Completion Port - 文本生成服务抽象
//!
//! OpenAI 兼容的 chat completion 接口，具体实现在 infrastructure/adapters 层

use async_trait::async_trait;
use thiserror::Error;

/// Chat 错误
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timeout")]
    Timeout,

    /// 额度耗尽或被限流，可切换到备用服务
    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("Service error: {0}")]
    ServiceError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ChatError {
    pub fn is_quota(&self) -> bool {
        matches!(self, ChatError::QuotaExceeded(_))
    }
}

/// 对话消息
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system",
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user",
            content: content.into(),
        }
    }
}

/// 生成请求
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// 为 None 时使用服务配置的默认模型
    pub model: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// 生成响应
#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub content: String,
    /// 实际提供服务的 provider 名称
    pub provider: String,
    pub model: String,
}

/// Chat Completion Port
#[async_trait]
pub trait ChatCompletionPort: Send + Sync {
    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, ChatError>;
}
