//! Fake Chat Client - 用于测试和离线运行的 chat 客户端
//!
//! 不发起网络请求，始终返回固定回复或固定错误

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::application::ports::{ChatCompletionPort, ChatError, ChatRequest, ChatResponse};

#[derive(Debug, Clone)]
enum FakeReply {
    Content(String),
    Quota,
    Network,
}

/// Fake Chat Client
pub struct FakeChatClient {
    name: String,
    reply: FakeReply,
    calls: AtomicUsize,
}

impl FakeChatClient {
    /// 始终返回 `content`
    pub fn replying(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self::build(name, FakeReply::Content(content.into()))
    }

    /// 始终返回额度耗尽
    pub fn quota_exceeded(name: impl Into<String>) -> Self {
        Self::build(name, FakeReply::Quota)
    }

    /// 始终返回网络错误
    pub fn unreachable(name: impl Into<String>) -> Self {
        Self::build(name, FakeReply::Network)
    }

    fn build(name: impl Into<String>, reply: FakeReply) -> Self {
        Self {
            name: name.into(),
            reply,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatCompletionPort for FakeChatClient {
    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, ChatError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(
            provider = %self.name,
            messages = request.messages.len(),
            "FakeChatClient: returning fixed reply"
        );

        match &self.reply {
            FakeReply::Content(content) => Ok(ChatResponse {
                content: content.clone(),
                provider: self.name.clone(),
                model: request.model.unwrap_or_else(|| "fake".to_string()),
            }),
            FakeReply::Quota => Err(ChatError::QuotaExceeded(format!(
                "{}: monthly credits exhausted",
                self.name
            ))),
            FakeReply::Network => Err(ChatError::NetworkError(format!(
                "Cannot connect to {}",
                self.name
            ))),
        }
    }
}
