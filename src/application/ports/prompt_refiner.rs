//! Prompt Refiner Port - 提示词优化
//!
//! 把用户的自由文本意图改写成视觉模型可直接使用的指令。
//! 该端口永不失败：出错时回退到原始输入

use async_trait::async_trait;
use serde::Serialize;

/// 优化方式
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RefinementOutcome {
    /// 调用方要求跳过，未发起任何外部调用
    Skipped,
    /// 优化成功
    Refined { provider: String },
    /// 优化失败，使用原始输入
    FellBack { reason: String },
}

/// 优化结果
#[derive(Debug, Clone)]
pub struct RefinedPrompt {
    pub text: String,
    pub outcome: RefinementOutcome,
}

#[async_trait]
pub trait PromptRefinerPort: Send + Sync {
    async fn refine(&self, user_instruction: &str, skip: bool) -> RefinedPrompt;
}
