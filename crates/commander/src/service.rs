//! Invocation boundary: one request in, one response out

use std::{sync::Arc, time::Instant};

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    audit::AuditLogger,
    brain::{build_provider, FailureCategory, LLMProviderTrait, ToolCall},
    catalog,
    config::CommandConfig,
    executor::{summary_message, ExecutionEngine, OperationResult},
    expansion::{build_preview, PreviewEntry},
    orchestrator::RoundOrchestrator,
    resolver::EntityDictionary,
    CommandError, Result,
};

const NOTHING_TO_DO: &str = "I couldn't find anything to do in that instruction.";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandRequest {
    #[serde(default)]
    pub instruction: String,
    /// Stop after planning and return a preview instead of executing
    #[serde(default)]
    pub preview_only: bool,
    /// A plan returned by an earlier preview; skips the reasoning rounds
    #[serde(default)]
    pub confirmed_plan: Option<Vec<ToolCall>>,
    /// Appended verbatim to the system prompt
    #[serde(default)]
    pub extra_rules: Option<String>,
    #[serde(default)]
    pub automation_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseOperations {
    Results(Vec<OperationResult>),
    Preview(Vec<PreviewEntry>),
}

impl ResponseOperations {
    pub fn len(&self) -> usize {
        match self {
            ResponseOperations::Results(r) => r.len(),
            ResponseOperations::Preview(p) => p.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResponse {
    pub success: bool,
    pub message: String,
    pub operations: ResponseOperations,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<Vec<ToolCall>>,
    pub execution_time_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_category: Option<FailureCategory>,
    /// Technical detail kept apart from the user-facing message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
}

impl CommandResponse {
    fn no_action(message: String, execution_time_ms: u64, log_id: Option<Uuid>) -> Self {
        Self {
            success: false,
            message,
            operations: ResponseOperations::Results(Vec::new()),
            preview: None,
            plan: None,
            execution_time_ms,
            log_id,
            error_category: None,
            error_detail: None,
        }
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

pub struct CommandService {
    pool: SqlitePool,
    provider: Arc<dyn LLMProviderTrait>,
    config: CommandConfig,
}

impl CommandService {
    pub fn new(pool: SqlitePool, provider: Arc<dyn LLMProviderTrait>, config: CommandConfig) -> Self {
        Self {
            pool,
            provider,
            config,
        }
    }

    pub fn from_config(pool: SqlitePool, config: CommandConfig) -> Self {
        let provider = build_provider(&config.llm);
        Self::new(pool, provider, config)
    }

    pub async fn handle(&self, request: CommandRequest) -> Result<CommandResponse> {
        let started = Instant::now();
        let automation_id = request.automation_id.as_deref();
        let instruction = request.instruction.trim();

        if let Some(plan) = request.confirmed_plan {
            tracing::info!("[COMMAND] Executing confirmed plan ({} call(s))", plan.len());
            return Ok(self.execute_plan(instruction, plan, started, automation_id).await);
        }

        if instruction.is_empty() {
            return Err(CommandError::InvalidRequest(
                "instruction must not be empty".to_string(),
            ));
        }

        if !self.provider.is_configured() {
            return Err(CommandError::ConfigError(format!(
                "{} reasoning backend is not configured (is OPENAI_API_KEY set?)",
                self.provider.name()
            )));
        }

        tracing::info!(
            "[COMMAND] New instruction (preview_only={}): {}",
            request.preview_only,
            instruction
        );

        let audit = AuditLogger::new(&self.pool);
        let dictionary = EntityDictionary::build(&self.pool, &self.config.default_assignee).await?;
        let orchestrator = RoundOrchestrator::new(
            self.provider.as_ref(),
            &self.pool,
            self.config.llm.chat_config(),
            self.config.max_rounds,
        );

        let outcome = match orchestrator
            .run(instruction, &dictionary, request.extra_rules.as_deref())
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!("[COMMAND] Reasoning backend failed: {}", e);
                let elapsed = elapsed_ms(started);
                let log_id = audit
                    .record_failure(instruction, "reasoning", &e.to_string(), elapsed, automation_id)
                    .await;
                return Ok(CommandResponse {
                    error_category: Some(e.category()),
                    error_detail: Some(e.to_string()),
                    ..CommandResponse::no_action(e.user_message().to_string(), elapsed, log_id)
                });
            }
        };

        let has_writes = outcome
            .tool_calls
            .iter()
            .any(|c| !catalog::is_read(&c.name));
        if !has_writes {
            let message = outcome
                .reply
                .filter(|r| !r.trim().is_empty())
                .unwrap_or_else(|| NOTHING_TO_DO.to_string());
            tracing::info!("[COMMAND] No actionable calls after {} round(s)", outcome.rounds);
            let elapsed = elapsed_ms(started);
            let log_id = audit
                .record_failure(instruction, "no_action", &message, elapsed, automation_id)
                .await;
            return Ok(CommandResponse::no_action(message, elapsed, log_id));
        }

        if request.preview_only {
            let preview = build_preview(&self.pool, &outcome.tool_calls).await?;
            if preview.is_empty() {
                tracing::info!("[COMMAND] Preview expanded to no operations");
                return Ok(CommandResponse {
                    preview: Some(true),
                    ..CommandResponse::no_action(NOTHING_TO_DO.to_string(), elapsed_ms(started), None)
                });
            }
            return Ok(CommandResponse {
                success: true,
                message: format!("{} operation(s) ready for confirmation.", preview.len()),
                operations: ResponseOperations::Preview(preview),
                preview: Some(true),
                plan: Some(outcome.tool_calls),
                execution_time_ms: elapsed_ms(started),
                log_id: None,
                error_category: None,
                error_detail: None,
            });
        }

        Ok(self
            .execute_plan(instruction, outcome.tool_calls, started, automation_id)
            .await)
    }

    async fn execute_plan(
        &self,
        instruction: &str,
        plan: Vec<ToolCall>,
        started: Instant,
        automation_id: Option<&str>,
    ) -> CommandResponse {
        let engine = ExecutionEngine::new(&self.pool, &self.config.default_assignee);
        let results = engine.execute(&plan).await;
        let message = summary_message(&results);
        let success = !results.is_empty() && results.iter().all(OperationResult::is_success);

        let elapsed = elapsed_ms(started);
        let log_id = AuditLogger::new(&self.pool)
            .record(instruction, &results, elapsed, automation_id)
            .await;

        tracing::info!("[COMMAND] {}", message);

        CommandResponse {
            success,
            message,
            operations: ResponseOperations::Results(results),
            preview: None,
            plan: None,
            execution_time_ms: elapsed,
            log_id,
            error_category: None,
            error_detail: None,
        }
    }
}
