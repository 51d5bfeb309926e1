//! Environment-driven configuration for the command pipeline

use serde::{Deserialize, Serialize};

use crate::brain::ProviderType;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_MAX_ROUNDS: usize = 5;
pub const DEFAULT_ASSIGNEE: &str = "Admin";

/// Reasoning backend settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LLMConfig {
    pub provider: ProviderType,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Override for the chat completions URL
    pub endpoint: Option<String>,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: ProviderType::OpenAI,
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.1,
            max_tokens: 2048,
            endpoint: None,
            api_key: None,
        }
    }
}

impl LLMConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let provider = non_empty_env("COMMAND_LLM_PROVIDER")
            .and_then(|v| match v.parse() {
                Ok(p) => Some(p),
                Err(e) => {
                    tracing::warn!("[COMMAND] {}; falling back to {}", e, defaults.provider);
                    None
                }
            })
            .unwrap_or(defaults.provider);

        Self {
            provider,
            model: non_empty_env("COMMAND_LLM_MODEL").unwrap_or(defaults.model),
            temperature: defaults.temperature,
            max_tokens: defaults.max_tokens,
            endpoint: non_empty_env("COMMAND_LLM_ENDPOINT"),
            api_key: non_empty_env("OPENAI_API_KEY"),
        }
    }
}

/// Settings for one command pipeline instance
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandConfig {
    pub llm: LLMConfig,
    /// Hard cap on reasoning rounds per invocation
    pub max_rounds: usize,
    /// Nickname of the person who owns tasks created without an explicit owner
    pub default_assignee: String,
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            llm: LLMConfig::default(),
            max_rounds: DEFAULT_MAX_ROUNDS,
            default_assignee: DEFAULT_ASSIGNEE.to_string(),
        }
    }
}

impl CommandConfig {
    pub fn from_env() -> Self {
        Self {
            llm: LLMConfig::from_env(),
            max_rounds: non_empty_env("COMMAND_MAX_ROUNDS")
                .and_then(|s| s.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(DEFAULT_MAX_ROUNDS),
            default_assignee: non_empty_env("COMMAND_DEFAULT_ASSIGNEE")
                .unwrap_or_else(|| DEFAULT_ASSIGNEE.to_string()),
        }
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
