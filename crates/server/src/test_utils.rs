use std::{collections::VecDeque, sync::Mutex, time::Duration};

use async_trait::async_trait;
use axum::{Router, response::Response};
use commander::{
    CommandConfig, CommandService, LLMProviderTrait, ProviderError, ToolCall,
    brain::{ChatRequest, ProviderResponse, ProviderType},
};
use serde_json::Value;

use crate::{
    AppState,
    middleware::{FixedWindowLimiter, RateLimitConfig},
    routes,
};

/// Replays canned backend replies in order, then answers with plain text
struct ReplayProvider {
    replies: Mutex<VecDeque<ProviderResponse>>,
}

#[async_trait]
impl LLMProviderTrait for ReplayProvider {
    fn provider_type(&self) -> ProviderType {
        ProviderType::OpenAI
    }

    fn name(&self) -> &'static str {
        "Replay"
    }

    fn is_configured(&self) -> bool {
        true
    }

    async fn chat(&self, _request: ChatRequest) -> Result<ProviderResponse, ProviderError> {
        Ok(self
            .replies
            .lock()
            .expect("lock")
            .pop_front()
            .unwrap_or_else(|| text("done")))
    }
}

pub fn call(id: &str, name: &str, arguments: Value) -> ToolCall {
    ToolCall {
        id: id.to_string(),
        name: name.to_string(),
        arguments,
    }
}

pub fn tool_calls(calls: Vec<ToolCall>) -> ProviderResponse {
    ProviderResponse::ToolCalls { calls, usage: None }
}

pub fn text(content: &str) -> ProviderResponse {
    ProviderResponse::Text {
        content: content.to_string(),
        usage: None,
    }
}

pub async fn test_app(replies: Vec<ProviderResponse>) -> (Router, AppState) {
    test_app_with(replies, RateLimitConfig::default().max_requests).await
}

/// Router over an in-memory database with a replaying backend and the given per-caller limit.
pub async fn test_app_with(replies: Vec<ProviderResponse>, max_requests: u32) -> (Router, AppState) {
    let db = db::DBService::new_in_memory()
        .await
        .expect("Failed to create in-memory database");
    let provider = std::sync::Arc::new(ReplayProvider {
        replies: Mutex::new(replies.into()),
    });
    let command = CommandService::new(db.pool.clone(), provider, CommandConfig::default());
    let limiter = FixedWindowLimiter::new(RateLimitConfig {
        max_requests,
        window: Duration::from_secs(60),
    });

    let state = AppState::new(db, command, limiter);
    (routes::router(state.clone()), state)
}

pub async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json body")
}
