//! HTTP Chat Client - 调用 OpenAI 兼容的 chat completion 服务
//!
//! POST {base_url}/chat/completions
//! Request: {"model": "...", "messages": [...], "max_tokens": n, "temperature": t}
//! Response: {"choices": [{"message": {"content": "..."}}]}

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::application::ports::{ChatCompletionPort, ChatError, ChatRequest, ChatResponse};

#[derive(Debug, Serialize)]
struct ChatHttpMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatHttpRequest<'a> {
    model: &'a str,
    messages: Vec<ChatHttpMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatHttpResponse {
    #[serde(default)]
    choices: Vec<ChatHttpChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatHttpChoice {
    message: ChatHttpChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatHttpChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// HTTP Chat 客户端配置
#[derive(Debug, Clone)]
pub struct HttpChatClientConfig {
    /// provider 名称，用于日志和结果记录
    pub name: String,
    /// 服务基础 URL（不含 /chat/completions）
    pub base_url: String,
    pub api_key: Option<String>,
    /// 默认模型
    pub model: String,
    /// 请求超时时间（秒）
    pub timeout_secs: u64,
}

impl Default for HttpChatClientConfig {
    fn default() -> Self {
        Self {
            name: "huggingface".to_string(),
            base_url: "https://router.huggingface.co/v1".to_string(),
            api_key: None,
            model: "Qwen/Qwen2.5-VL-7B-Instruct".to_string(),
            timeout_secs: 60,
        }
    }
}

impl HttpChatClientConfig {
    pub fn new(name: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

/// HTTP Chat 客户端
pub struct HttpChatClient {
    client: Client,
    config: HttpChatClientConfig,
}

impl HttpChatClient {
    pub fn new(config: HttpChatClientConfig) -> Result<Self, ChatError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ChatError::NetworkError(e.to_string()))?;

        Ok(Self { client, config })
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }
}

/// 非 2xx 响应分类：额度/限流可切换备用服务，其余为服务错误
fn classify_http_error(status: StatusCode, body: &str) -> ChatError {
    let lowered = body.to_lowercase();
    let quota = status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::PAYMENT_REQUIRED
        || lowered.contains("quota")
        || lowered.contains("rate limit")
        || lowered.contains("rate_limit");

    if quota {
        ChatError::QuotaExceeded(format!("HTTP {}: {}", status, body))
    } else {
        ChatError::ServiceError(format!("HTTP {}: {}", status, body))
    }
}

/// 去掉模型偶尔包裹的 markdown 代码块
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(inner) = inner.strip_suffix("```") else {
        return trimmed;
    };
    // 跳过语言标记所在的首行
    match inner.find('\n') {
        Some(pos) if !inner[..pos].trim().contains(' ') => inner[pos + 1..].trim(),
        _ => inner.trim(),
    }
}

#[async_trait]
impl ChatCompletionPort for HttpChatClient {
    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, ChatError> {
        let model = request.model.as_deref().unwrap_or(&self.config.model);
        let http_request = ChatHttpRequest {
            model,
            messages: request
                .messages
                .iter()
                .map(|m| ChatHttpMessage {
                    role: m.role,
                    content: &m.content,
                })
                .collect(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        tracing::debug!(
            provider = %self.config.name,
            url = %self.completions_url(),
            model = %model,
            messages = http_request.messages.len(),
            "Sending chat completion request"
        );

        let mut builder = self.client.post(self.completions_url()).json(&http_request);
        if let Some(api_key) = &self.config.api_key {
            builder = builder.bearer_auth(api_key);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                ChatError::Timeout
            } else if e.is_connect() {
                ChatError::NetworkError(format!(
                    "Cannot connect to {}: {}",
                    self.config.name, e
                ))
            } else {
                ChatError::NetworkError(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(classify_http_error(status, &error_text));
        }

        let body: ChatHttpResponse = response
            .json()
            .await
            .map_err(|e| ChatError::InvalidResponse(format!("Failed to decode reply: {}", e)))?;

        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ChatError::InvalidResponse("reply has no choices".to_string()))?;

        tracing::info!(
            provider = %self.config.name,
            model = %model,
            reply_len = content.len(),
            "Chat completion finished"
        );

        Ok(ChatResponse {
            content: strip_code_fence(&content).to_string(),
            provider: self.config.name.clone(),
            model: model.to_string(),
        })
    }
}
