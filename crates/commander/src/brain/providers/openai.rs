//! OpenAI-compatible chat completions provider (OpenAI proper or a local Ollama server)

use async_trait::async_trait;
use reqwest::Client;

use super::provider_trait::{
    ChatMessage, ChatRequest, LLMProviderTrait, MessageRole, ProviderError, ProviderResponse,
    ProviderType, TokenUsage, ToolCall, ToolDefinition,
};
use crate::config::LLMConfig;

const OPENAI_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
const OLLAMA_ENDPOINT: &str = "http://localhost:11434/v1/chat/completions";

pub struct OpenAIProvider {
    client: Client,
    provider_type: ProviderType,
    api_key: Option<String>,
    endpoint: String,
}

impl OpenAIProvider {
    pub fn new(config: &LLMConfig) -> Self {
        let endpoint = config.endpoint.clone().unwrap_or_else(|| {
            match config.provider {
                ProviderType::OpenAI => OPENAI_ENDPOINT,
                ProviderType::Ollama => OLLAMA_ENDPOINT,
            }
            .to_string()
        });

        if config.provider == ProviderType::OpenAI && config.api_key.is_none() {
            tracing::warn!("OpenAI provider created without API key - OPENAI_API_KEY env var not found");
        } else {
            tracing::info!("{} provider initialized ({})", config.provider, endpoint);
        }

        Self {
            client: Client::new(),
            provider_type: config.provider,
            api_key: config.api_key.clone(),
            endpoint,
        }
    }

    /// Convert our ChatMessage to the chat completions wire format
    fn message_to_openai(&self, msg: &ChatMessage) -> serde_json::Value {
        let role = match msg.role {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::Tool => "tool",
        };

        let mut obj = serde_json::json!({
            "role": role,
            "content": msg.content
        });

        if let Some(ref tool_call_id) = msg.tool_call_id {
            obj["tool_call_id"] = serde_json::json!(tool_call_id);
        }

        if let Some(ref tool_calls) = msg.tool_calls {
            let calls: Vec<serde_json::Value> = tool_calls
                .iter()
                .map(|tc| {
                    // Arguments that never parsed are echoed back as the original string.
                    let arguments = match &tc.arguments {
                        serde_json::Value::String(raw) => raw.clone(),
                        other => other.to_string(),
                    };
                    serde_json::json!({
                        "id": tc.id,
                        "type": "function",
                        "function": {
                            "name": tc.name,
                            "arguments": arguments
                        }
                    })
                })
                .collect();
            obj["tool_calls"] = serde_json::json!(calls);
            if msg.content.is_empty() {
                obj["content"] = serde_json::Value::Null;
            }
        }

        obj
    }

    fn tool_to_openai(&self, tool: &ToolDefinition) -> serde_json::Value {
        serde_json::json!({
            "type": "function",
            "function": {
                "name": tool.name,
                "description": tool.description,
                "parameters": tool.parameters
            }
        })
    }

    fn parse_response(&self, json: &serde_json::Value) -> Result<ProviderResponse, ProviderError> {
        let message = json
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .ok_or_else(|| ProviderError::ParseError("response has no choices".to_string()))?;

        let usage = json.get("usage").and_then(|u| {
            Some(TokenUsage {
                input_tokens: u["prompt_tokens"].as_u64()? as u32,
                output_tokens: u["completion_tokens"].as_u64()? as u32,
                total_tokens: u["total_tokens"].as_u64()? as u32,
            })
        });

        if let Some(tool_calls) = message["tool_calls"].as_array() {
            let calls: Vec<ToolCall> = tool_calls
                .iter()
                .filter_map(|tc| {
                    let id = tc["id"].as_str()?.to_string();
                    let name = tc["function"]["name"].as_str()?.to_string();
                    let args_str = tc["function"]["arguments"].as_str().unwrap_or("{}");
                    let arguments = match serde_json::from_str::<serde_json::Value>(args_str) {
                        Ok(value) => value,
                        Err(e) => {
                            tracing::warn!("[BRAIN] Tool call {} has malformed arguments: {}", name, e);
                            serde_json::Value::String(args_str.to_string())
                        }
                    };

                    Some(ToolCall {
                        id,
                        name,
                        arguments,
                    })
                })
                .collect();

            if !calls.is_empty() {
                return Ok(ProviderResponse::ToolCalls { calls, usage });
            }
        }

        let content = message["content"]
            .as_str()
            .unwrap_or("")
            .trim()
            .to_string();

        Ok(ProviderResponse::Text { content, usage })
    }
}

#[async_trait]
impl LLMProviderTrait for OpenAIProvider {
    fn provider_type(&self) -> ProviderType {
        self.provider_type
    }

    fn name(&self) -> &'static str {
        match self.provider_type {
            ProviderType::OpenAI => "OpenAI",
            ProviderType::Ollama => "Ollama",
        }
    }

    fn is_configured(&self) -> bool {
        match self.provider_type {
            ProviderType::OpenAI => self.api_key.is_some(),
            ProviderType::Ollama => true,
        }
    }

    async fn chat(&self, request: ChatRequest) -> Result<ProviderResponse, ProviderError> {
        let messages: Vec<serde_json::Value> = request
            .messages
            .iter()
            .map(|m| self.message_to_openai(m))
            .collect();

        let mut payload = serde_json::json!({
            "model": request.config.model,
            "temperature": request.config.temperature,
            "max_tokens": request.config.max_tokens,
            "messages": messages
        });

        if let Some(ref tools) = request.tools {
            if !tools.is_empty() {
                let openai_tools: Vec<serde_json::Value> =
                    tools.iter().map(|t| self.tool_to_openai(t)).collect();
                payload["tools"] = serde_json::json!(openai_tools);
                payload["tool_choice"] = serde_json::json!("auto");
            }
        }

        tracing::debug!(
            "[BRAIN] Sending request: provider={}, model={}, messages={}, tools={}",
            self.provider_type,
            request.config.model,
            messages.len(),
            request.tools.as_ref().map(|t| t.len()).unwrap_or(0)
        );

        let mut builder = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(&payload);

        if let Some(ref key) = self.api_key {
            builder = builder.header("Authorization", format!("Bearer {}", key));
        } else if self.provider_type == ProviderType::OpenAI {
            return Err(ProviderError::AuthError(
                "No OpenAI API key configured".to_string(),
            ));
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after_ms = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(|secs| secs * 1000);
            let body = response.text().await.unwrap_or_default();

            return Err(match status.as_u16() {
                429 => ProviderError::RateLimited { retry_after_ms },
                401 | 403 => ProviderError::AuthError(body),
                code => ProviderError::ApiError {
                    status: code,
                    message: body,
                },
            });
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        self.parse_response(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> OpenAIProvider {
        OpenAIProvider::new(&LLMConfig {
            api_key: Some("test-key".into()),
            ..LLMConfig::default()
        })
    }

    #[test]
    fn message_conversion() {
        let provider = provider();

        let json = provider.message_to_openai(&ChatMessage::user("Hello"));
        assert_eq!(json["role"], "user");
        assert_eq!(json["content"], "Hello");

        let json = provider.message_to_openai(&ChatMessage::tool_result("call_1", "[]"));
        assert_eq!(json["role"], "tool");
        assert_eq!(json["tool_call_id"], "call_1");
    }

    #[test]
    fn assistant_tool_calls_serialize_arguments_as_strings() {
        let provider = provider();
        let msg = ChatMessage::assistant_with_tools(vec![
            ToolCall {
                id: "call_1".into(),
                name: "list_projects".into(),
                arguments: serde_json::json!({"status": "active"}),
            },
            ToolCall {
                id: "call_2".into(),
                name: "create_project".into(),
                arguments: serde_json::Value::String("{not json".into()),
            },
        ]);

        let json = provider.message_to_openai(&msg);
        assert!(json["content"].is_null());
        assert_eq!(
            json["tool_calls"][0]["function"]["arguments"],
            r#"{"status":"active"}"#
        );
        assert_eq!(json["tool_calls"][1]["function"]["arguments"], "{not json");
    }

    #[test]
    fn parse_tool_call_response_keeps_malformed_arguments() {
        let provider = provider();
        let body = serde_json::json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [
                        {"id": "a", "type": "function", "function": {"name": "create_project", "arguments": "{\"name\":\"Q1\"}"}},
                        {"id": "b", "type": "function", "function": {"name": "create_project", "arguments": "{\"name\":"}}
                    ]
                }
            }],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        });

        match provider.parse_response(&body).expect("parse failed") {
            ProviderResponse::ToolCalls { calls, usage } => {
                assert_eq!(calls.len(), 2);
                assert_eq!(calls[0].arguments["name"], "Q1");
                assert_eq!(calls[1].arguments, serde_json::json!("{\"name\":"));
                assert_eq!(usage.map(|u| u.total_tokens), Some(15));
            }
            other => panic!("expected tool calls, got {:?}", other),
        }
    }

    #[test]
    fn parse_text_response() {
        let provider = provider();
        let body = serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "  Hello there  "}}]
        });

        match provider.parse_response(&body).expect("parse failed") {
            ProviderResponse::Text { content, .. } => assert_eq!(content, "Hello there"),
            other => panic!("expected text, got {:?}", other),
        }
    }

    #[test]
    fn missing_choices_is_parse_error() {
        let provider = provider();
        let err = provider
            .parse_response(&serde_json::json!({"error": "nope"}))
            .expect_err("should fail");
        assert!(matches!(err, ProviderError::ParseError(_)));
    }

    #[test]
    fn ollama_needs_no_key() {
        let provider = OpenAIProvider::new(&LLMConfig {
            provider: ProviderType::Ollama,
            api_key: None,
            ..LLMConfig::default()
        });
        assert!(provider.is_configured());
        assert_eq!(provider.endpoint, OLLAMA_ENDPOINT);

        let openai = OpenAIProvider::new(&LLMConfig {
            api_key: None,
            ..LLMConfig::default()
        });
        assert!(!openai.is_configured());
    }
}
