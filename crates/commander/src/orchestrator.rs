//! Reasoning round orchestrator
//!
//! Drives a bounded conversation with the reasoning backend. Reads requested by
//! the backend are answered inline and fed back; writes are only collected.
//! The loop ends when a round asks for no reads, returns plain text, or the
//! round cap is hit.

use chrono::Utc;
use serde_json::json;
use sqlx::SqlitePool;

use crate::{
    brain::{
        ChatConfig, ChatMessage, ChatRequest, LLMProviderTrait, ProviderError, ProviderResponse,
        ToolCall,
    },
    catalog,
    executor::run_read,
    operations::Operation,
    resolver::EntityDictionary,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundState {
    /// Waiting on the backend for the next round
    Gathering,
    /// Answering the reads the last round asked for
    ReadSatisfying,
    Done,
}

/// Everything the backend asked for, in request order
#[derive(Debug, Clone, Default)]
pub struct RoundOutcome {
    pub tool_calls: Vec<ToolCall>,
    pub rounds: usize,
    /// Free text from the final round, if it ended with text
    pub reply: Option<String>,
}

pub struct RoundOrchestrator<'a> {
    provider: &'a dyn LLMProviderTrait,
    pool: &'a SqlitePool,
    chat_config: ChatConfig,
    max_rounds: usize,
}

impl<'a> RoundOrchestrator<'a> {
    pub fn new(
        provider: &'a dyn LLMProviderTrait,
        pool: &'a SqlitePool,
        chat_config: ChatConfig,
        max_rounds: usize,
    ) -> Self {
        Self {
            provider,
            pool,
            chat_config,
            max_rounds: max_rounds.max(1),
        }
    }

    pub async fn run(
        &self,
        instruction: &str,
        dictionary: &EntityDictionary,
        extra_rules: Option<&str>,
    ) -> Result<RoundOutcome, ProviderError> {
        let mut messages = vec![
            ChatMessage::system(build_system_prompt(dictionary, extra_rules)),
            ChatMessage::user(instruction),
        ];
        let tools = catalog::tool_definitions();

        let mut outcome = RoundOutcome::default();
        let mut pending: Vec<ToolCall> = Vec::new();
        let mut state = RoundState::Gathering;

        while state != RoundState::Done {
            state = match state {
                RoundState::Gathering => {
                    if outcome.rounds >= self.max_rounds {
                        tracing::info!("[ROUNDS] Round cap of {} reached", self.max_rounds);
                        RoundState::Done
                    } else {
                        let response = self
                            .provider
                            .chat(ChatRequest {
                                messages: messages.clone(),
                                tools: Some(tools.clone()),
                                config: self.chat_config.clone(),
                            })
                            .await?;
                        outcome.rounds += 1;
                        if let Some(usage) = response.usage() {
                            tracing::debug!(
                                "[ROUNDS] Round {} used {} token(s)",
                                outcome.rounds,
                                usage.total_tokens
                            );
                        }

                        match response {
                            ProviderResponse::Text { content, .. } => {
                                tracing::info!(
                                    "[ROUNDS] Round {} ended with text, no further calls",
                                    outcome.rounds
                                );
                                outcome.reply = Some(content);
                                RoundState::Done
                            }
                            ProviderResponse::ToolCalls { calls, .. } => {
                                let reads = calls.iter().filter(|c| catalog::is_read(&c.name)).count();
                                tracing::info!(
                                    "[ROUNDS] Round {}: {} call(s), {} read(s)",
                                    outcome.rounds,
                                    calls.len(),
                                    reads
                                );

                                messages.push(ChatMessage::assistant_with_tools(calls.clone()));
                                outcome.tool_calls.extend(calls.iter().cloned());
                                pending = calls;

                                if reads > 0 {
                                    RoundState::ReadSatisfying
                                } else {
                                    RoundState::Done
                                }
                            }
                        }
                    }
                }
                RoundState::ReadSatisfying => {
                    for call in pending.drain(..) {
                        let content = self.answer(&call).await;
                        messages.push(ChatMessage::tool_result(call.id, content));
                    }
                    RoundState::Gathering
                }
                RoundState::Done => RoundState::Done,
            };
        }

        Ok(outcome)
    }

    /// Tool message for one call of a read round. Writes are acknowledged, not run.
    async fn answer(&self, call: &ToolCall) -> String {
        if !catalog::is_read(&call.name) {
            return json!({
                "status": "queued",
                "message": "Recorded; runs after planning finishes"
            })
            .to_string();
        }

        tracing::debug!("[ROUNDS] Satisfying read {} with args: {}", call.name, call.arguments);

        let result = match Operation::parse(&call.name, &call.arguments) {
            Ok(op) => run_read(self.pool, &op).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(value) => value.to_string(),
            Err(e) => json!({ "error": e.to_string() }).to_string(),
        }
    }
}

pub fn build_system_prompt(dictionary: &EntityDictionary, extra_rules: Option<&str>) -> String {
    let mut parts = vec![
        "You turn one instruction into calls to the provided functions, which manage projects, \
         team members, requirements (tasks) and goal templates."
            .to_string(),
        format!("Today is {}.", Utc::now().date_naive().format("%Y-%m-%d")),
        String::new(),
        "RULES:".to_string(),
        "- Only use ids that appear below or in function results. Never invent an id.".to_string(),
        "- Match loose names against the aliases below; if a reference is ambiguous, ask instead of guessing.".to_string(),
        "- To act on something you just created in the same instruction, omit its id; it is filled in automatically.".to_string(),
        "- Use the list_* functions when you need data that is not shown below.".to_string(),
        "- Use create_requirement_for_each_member for \"every team member\" style requests.".to_string(),
        "- Request every write needed in order. If nothing can be done, reply in plain text.".to_string(),
        String::new(),
        dictionary.render(),
    ];

    if let Some(rules) = extra_rules.map(str::trim).filter(|r| !r.is_empty()) {
        parts.push("ADDITIONAL RULES:".to_string());
        parts.push(rules.to_string());
    }

    parts.join("\n")
}
