//! Reasoning backend abstraction
//!
//! A trait-based seam over chat-completion endpoints so the round orchestrator
//! never depends on a concrete vendor.

mod openai;
mod provider_trait;

pub use openai::OpenAIProvider;
pub use provider_trait::{
    ChatConfig, ChatMessage, ChatRequest, FailureCategory, LLMProviderTrait, MessageRole,
    ProviderError, ProviderResponse, ProviderType, TokenUsage, ToolCall, ToolDefinition,
};
