//! LLM abstraction layer
//!
//! The agent loop and the pipeline only ever see [`ChatModel`]. Anything
//! runtime specific stays behind it.

mod mock;
mod ollama;
mod types;

pub use mock::MockModel;
pub use ollama::{list_models, ModelInfo, OllamaChat};
pub use types::{
    ChatRequest, ChatResponse, Message, ResponseMessage, Role, ToolInvocation, ToolSchema,
    ToolSchemaFunction,
};

use anyhow::Result;
use async_trait::async_trait;

/// Trait for chat-completion backends
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Send one non-streaming chat request and wait for the full response
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse>;
}
