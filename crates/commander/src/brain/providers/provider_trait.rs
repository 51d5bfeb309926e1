//! Provider trait and common types for the reasoning backend

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Supported reasoning backend types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    OpenAI,
    /// Ollama local LLM (OpenAI-compatible)
    Ollama,
}

impl Default for ProviderType {
    fn default() -> Self {
        ProviderType::OpenAI
    }
}

impl std::fmt::Display for ProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderType::OpenAI => write!(f, "openai"),
            ProviderType::Ollama => write!(f, "ollama"),
        }
    }
}

impl std::str::FromStr for ProviderType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(ProviderType::OpenAI),
            "ollama" => Ok(ProviderType::Ollama),
            _ => Err(format!("Unknown provider type: {}", s)),
        }
    }
}

/// Error type for provider operations
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("API error ({status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Response parse error: {0}")]
    ParseError(String),

    #[error("Rate limited: retry after {retry_after_ms:?}ms")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("Authentication failed: {0}")]
    AuthError(String),
}

/// User-facing grouping of backend failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCategory {
    Authentication,
    RateLimit,
    Network,
    Backend,
}

impl ProviderError {
    pub fn category(&self) -> FailureCategory {
        match self {
            ProviderError::AuthError(_) => FailureCategory::Authentication,
            ProviderError::ApiError { status: 401 | 403, .. } => FailureCategory::Authentication,
            ProviderError::RateLimited { .. } | ProviderError::ApiError { status: 429, .. } => {
                FailureCategory::RateLimit
            }
            ProviderError::RequestFailed(_) => FailureCategory::Network,
            ProviderError::ApiError { .. } | ProviderError::ParseError(_) => {
                FailureCategory::Backend
            }
        }
    }

    /// Summary safe to show the operator; the `Display` output is the technical detail.
    pub fn user_message(&self) -> &'static str {
        match self.category() {
            FailureCategory::Authentication => {
                "The AI service rejected the configured credentials. Check the API key and try again."
            }
            FailureCategory::RateLimit => {
                "The AI service is busy right now. Please wait a moment and try again."
            }
            FailureCategory::Network => {
                "Could not reach the AI service. Check the network connection and try again."
            }
            FailureCategory::Backend => {
                "The AI service returned an unexpected response. Please try again."
            }
        }
    }
}

/// Role of a message in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    Tool,
}

/// A message in the conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
    /// For tool role messages - the ID of the tool call this is responding to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// For assistant messages that include tool calls
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
            tool_call_id: None,
            tool_calls: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            tool_call_id: None,
            tool_calls: None,
        }
    }

    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Tool,
            content: content.into(),
            tool_call_id: Some(tool_call_id.into()),
            tool_calls: None,
        }
    }

    pub fn assistant_with_tools(tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: String::new(),
            tool_call_id: None,
            tool_calls: Some(tool_calls),
        }
    }
}

/// A tool call requested by the backend.
///
/// `arguments` is untrusted: normally a JSON object, but a payload that failed to
/// parse is kept verbatim as a JSON string so the failure surfaces on that call alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    #[serde(alias = "operationName")]
    pub name: String,
    #[serde(default, alias = "rawArguments")]
    pub arguments: serde_json::Value,
}

/// Tool definition for function calling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// Configuration for a chat request
#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            temperature: 0.1,
            max_tokens: 2048,
        }
    }
}

/// A complete chat request
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub tools: Option<Vec<ToolDefinition>>,
    pub config: ChatConfig,
}

/// Response from a provider
#[derive(Debug, Clone)]
pub enum ProviderResponse {
    /// Text response from the backend
    Text {
        content: String,
        usage: Option<TokenUsage>,
    },
    /// Backend wants to call tools
    ToolCalls {
        calls: Vec<ToolCall>,
        usage: Option<TokenUsage>,
    },
}

impl ProviderResponse {
    pub fn usage(&self) -> Option<&TokenUsage> {
        match self {
            ProviderResponse::Text { usage, .. } => usage.as_ref(),
            ProviderResponse::ToolCalls { usage, .. } => usage.as_ref(),
        }
    }
}

/// Token usage information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub total_tokens: u32,
}

/// Trait that every reasoning backend implements
#[async_trait]
pub trait LLMProviderTrait: Send + Sync {
    fn provider_type(&self) -> ProviderType;

    /// Provider name for logging/display
    fn name(&self) -> &'static str;

    /// Whether credentials and endpoint are present
    fn is_configured(&self) -> bool;

    /// Send a chat request and get a response
    async fn chat(&self, request: ChatRequest) -> Result<ProviderResponse, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_type_round_trips_through_strings() {
        assert_eq!("OpenAI".parse::<ProviderType>(), Ok(ProviderType::OpenAI));
        assert_eq!(" ollama ".parse::<ProviderType>(), Ok(ProviderType::Ollama));
        assert!("claude".parse::<ProviderType>().is_err());
        assert_eq!(ProviderType::Ollama.to_string(), "ollama");
    }

    #[test]
    fn errors_classify_into_user_categories() {
        assert_eq!(
            ProviderError::AuthError("missing key".into()).category(),
            FailureCategory::Authentication
        );
        assert_eq!(
            ProviderError::ApiError { status: 401, message: "bad key".into() }.category(),
            FailureCategory::Authentication
        );
        assert_eq!(
            ProviderError::ApiError { status: 429, message: "slow down".into() }.category(),
            FailureCategory::RateLimit
        );
        assert_eq!(
            ProviderError::RequestFailed("connection refused".into()).category(),
            FailureCategory::Network
        );
        assert_eq!(
            ProviderError::ApiError { status: 500, message: "boom".into() }.category(),
            FailureCategory::Backend
        );
    }

    #[test]
    fn user_message_hides_technical_detail() {
        let err = ProviderError::ApiError {
            status: 401,
            message: "sk-secret is invalid".into(),
        };
        assert!(!err.user_message().contains("sk-secret"));
        assert!(err.to_string().contains("sk-secret"));
    }
}
