//! Fallback Chat Client - 主服务额度耗尽时切换到备用服务
//!
//! 主服务只尝试一次；仅 QuotaExceeded 触发切换，备用服务也只尝试一次

use async_trait::async_trait;
use std::sync::Arc;

use crate::application::ports::{ChatCompletionPort, ChatError, ChatRequest, ChatResponse};

pub struct FallbackChatClient {
    primary: Arc<dyn ChatCompletionPort>,
    fallback: Option<Arc<dyn ChatCompletionPort>>,
}

impl FallbackChatClient {
    pub fn new(
        primary: Arc<dyn ChatCompletionPort>,
        fallback: Option<Arc<dyn ChatCompletionPort>>,
    ) -> Self {
        Self { primary, fallback }
    }
}

#[async_trait]
impl ChatCompletionPort for FallbackChatClient {
    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, ChatError> {
        let fallback = match &self.fallback {
            Some(fallback) => fallback,
            None => return self.primary.complete(request).await,
        };

        match self.primary.complete(request.clone()).await {
            Err(e) if e.is_quota() => {
                tracing::warn!(error = %e, "Primary provider quota exhausted, trying fallback");
                let response = fallback.complete(request).await?;
                tracing::info!(provider = %response.provider, "Fallback provider served request");
                Ok(response)
            }
            other => other,
        }
    }
}
