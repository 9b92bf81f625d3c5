//! LLM Adapter - chat completion 服务客户端

mod fake_chat_client;
mod fallback_chat_client;
mod http_chat_client;

pub use fake_chat_client::FakeChatClient;
pub use fallback_chat_client::FallbackChatClient;
pub use http_chat_client::{HttpChatClient, HttpChatClientConfig};
