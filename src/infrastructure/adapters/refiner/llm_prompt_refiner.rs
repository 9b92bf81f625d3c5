//! LLM Prompt Refiner - 用 chat completion 改写用户意图
//!
//! 失败永不向上传播：记录警告并返回原始输入

use async_trait::async_trait;
use std::sync::Arc;

use crate::application::error::PipelineError;
use crate::application::ports::{
    ChatCompletionPort, ChatMessage, ChatRequest, PromptRefinerPort, RefinedPrompt,
    RefinementOutcome,
};

const REFINE_SYSTEM_PROMPT: &str = "You rewrite requests for a computer vision model that \
inspects video frames of people. Turn the user's request into one precise, self-contained \
detection instruction: name exactly what to look for in each visible person (emotion, action, \
pose, expression, clothing or activity), and say what to report when it is absent. Reply with \
the instruction only, no preamble, no quotes, no markdown.";

/// Refiner 配置
#[derive(Debug, Clone)]
pub struct PromptRefinerConfig {
    /// 为 None 时由 provider 选择默认模型
    pub model: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for PromptRefinerConfig {
    fn default() -> Self {
        Self {
            model: None,
            max_tokens: 256,
            temperature: 0.2,
        }
    }
}

pub struct LlmPromptRefiner {
    chat: Arc<dyn ChatCompletionPort>,
    config: PromptRefinerConfig,
}

impl LlmPromptRefiner {
    pub fn new(chat: Arc<dyn ChatCompletionPort>, config: PromptRefinerConfig) -> Self {
        Self { chat, config }
    }

    fn request(&self, user_instruction: &str) -> ChatRequest {
        ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage::system(REFINE_SYSTEM_PROMPT),
                ChatMessage::user(user_instruction),
            ],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        }
    }

    fn fall_back(user_instruction: &str, reason: String) -> RefinedPrompt {
        let error = PipelineError::Refinement(reason.clone());
        tracing::warn!(error = %error, "Using original task description");
        RefinedPrompt {
            text: user_instruction.to_string(),
            outcome: RefinementOutcome::FellBack { reason },
        }
    }
}

#[async_trait]
impl PromptRefinerPort for LlmPromptRefiner {
    async fn refine(&self, user_instruction: &str, skip: bool) -> RefinedPrompt {
        if skip {
            return RefinedPrompt {
                text: user_instruction.to_string(),
                outcome: RefinementOutcome::Skipped,
            };
        }

        match self.chat.complete(self.request(user_instruction)).await {
            Ok(response) => {
                let text = response.content.trim();
                if text.is_empty() {
                    return Self::fall_back(user_instruction, "empty reply".to_string());
                }
                tracing::info!(
                    provider = %response.provider,
                    model = %response.model,
                    refined_len = text.len(),
                    "Task description refined"
                );
                RefinedPrompt {
                    text: text.to_string(),
                    outcome: RefinementOutcome::Refined {
                        provider: response.provider,
                    },
                }
            }
            Err(e) => Self::fall_back(user_instruction, e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::adapters::llm::FakeChatClient;

    fn refiner(chat: Arc<FakeChatClient>) -> LlmPromptRefiner {
        LlmPromptRefiner::new(chat, PromptRefinerConfig::default())
    }

    #[tokio::test]
    async fn test_skip_makes_no_calls() {
        let chat = Arc::new(FakeChatClient::replying("hf", "refined"));
        let refined = refiner(chat.clone()).refine("find smiles", true).await;

        assert_eq!(refined.text, "find smiles");
        assert_eq!(refined.outcome, RefinementOutcome::Skipped);
        assert_eq!(chat.calls(), 0);
    }

    #[tokio::test]
    async fn test_reply_is_trimmed() {
        let chat = Arc::new(FakeChatClient::replying(
            "hf",
            "  Detect whether each person is smiling.\n",
        ));
        let refined = refiner(chat.clone()).refine("find smiles", false).await;

        assert_eq!(refined.text, "Detect whether each person is smiling.");
        assert_eq!(
            refined.outcome,
            RefinementOutcome::Refined {
                provider: "hf".to_string()
            }
        );
        assert_eq!(chat.calls(), 1);
    }

    #[tokio::test]
    async fn test_error_returns_original() {
        let chat = Arc::new(FakeChatClient::quota_exceeded("hf"));
        let refined = refiner(chat).refine("find smiles", false).await;

        assert_eq!(refined.text, "find smiles");
        assert!(matches!(refined.outcome, RefinementOutcome::FellBack { .. }));
    }

    #[tokio::test]
    async fn test_empty_reply_returns_original() {
        let chat = Arc::new(FakeChatClient::replying("hf", "   \n"));
        let refined = refiner(chat).refine("find smiles", false).await;

        assert_eq!(refined.text, "find smiles");
        assert_eq!(
            refined.outcome,
            RefinementOutcome::FellBack {
                reason: "empty reply".to_string()
            }
        );
    }
}
