use std::{collections::VecDeque, sync::Mutex};

use async_trait::async_trait;
use db::models::{
    project::{CreateProject, Project},
    team_member::{CreateTeamMember, TeamMember},
};
use serde_json::Value;
use uuid::Uuid;

use crate::brain::{
    ChatRequest, LLMProviderTrait, ProviderError, ProviderResponse, ProviderType, ToolCall,
};

/// Reasoning backend that replays canned responses and records every request
pub struct ScriptedProvider {
    responses: Mutex<VecDeque<Result<ProviderResponse, ProviderError>>>,
    pub seen: Mutex<Vec<ChatRequest>>,
    configured: bool,
}

impl ScriptedProvider {
    pub fn new(responses: Vec<ProviderResponse>) -> Self {
        Self::with_results(responses.into_iter().map(Ok).collect())
    }

    pub fn with_results(responses: Vec<Result<ProviderResponse, ProviderError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            seen: Mutex::new(Vec::new()),
            configured: true,
        }
    }

    pub fn unconfigured() -> Self {
        Self {
            configured: false,
            ..Self::new(Vec::new())
        }
    }

    pub fn request_count(&self) -> usize {
        self.seen.lock().expect("lock").len()
    }
}

#[async_trait]
impl LLMProviderTrait for ScriptedProvider {
    fn provider_type(&self) -> ProviderType {
        ProviderType::OpenAI
    }

    fn name(&self) -> &'static str {
        "Scripted"
    }

    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn chat(&self, request: ChatRequest) -> Result<ProviderResponse, ProviderError> {
        self.seen.lock().expect("lock").push(request);
        self.responses
            .lock()
            .expect("lock")
            .pop_front()
            .unwrap_or(Ok(ProviderResponse::Text {
                content: "done".into(),
                usage: None,
            }))
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

pub async fn setup_db() -> db::DBService {
    db::DBService::new_in_memory()
        .await
        .expect("Failed to create in-memory database")
}

pub async fn create_project(pool: &sqlx::SqlitePool, name: &str) -> Project {
    Project::create(
        pool,
        &CreateProject {
            name: name.to_string(),
            ..Default::default()
        },
        Uuid::new_v4(),
    )
    .await
    .expect("Failed to create project")
}

pub async fn create_member(pool: &sqlx::SqlitePool, nickname: &str, role: Option<&str>) -> TeamMember {
    TeamMember::create(
        pool,
        &CreateTeamMember {
            nickname: nickname.to_string(),
            role: role.map(str::to_string),
        },
        Uuid::new_v4(),
    )
    .await
    .expect("Failed to create team member")
}
