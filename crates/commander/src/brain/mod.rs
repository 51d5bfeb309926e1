//! Reasoning backend wiring

use std::sync::Arc;

pub mod providers;

pub use providers::{
    ChatConfig, ChatMessage, ChatRequest, FailureCategory, LLMProviderTrait, MessageRole,
    OpenAIProvider, ProviderError, ProviderResponse, ProviderType, TokenUsage, ToolCall,
    ToolDefinition,
};

use crate::config::LLMConfig;

/// Build the provider selected by `config`. Both supported backends speak the
/// OpenAI chat-completions protocol.
pub fn build_provider(config: &LLMConfig) -> Arc<dyn LLMProviderTrait> {
    Arc::new(OpenAIProvider::new(config))
}

impl LLMConfig {
    pub fn chat_config(&self) -> ChatConfig {
        ChatConfig {
            model: self.model.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}
