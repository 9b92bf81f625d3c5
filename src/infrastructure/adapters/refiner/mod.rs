//! Refiner Adapter - 提示词优化

mod llm_prompt_refiner;

pub use llm_prompt_refiner::{LlmPromptRefiner, PromptRefinerConfig};
