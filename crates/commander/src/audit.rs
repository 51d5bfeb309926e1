//! Audit logger: one append-only record per invocation

use db::models::automation_log::{AutomationLog, CreateAutomationLog};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::executor::OperationResult;

pub struct AuditLogger<'a> {
    pool: &'a SqlitePool,
}

impl<'a> AuditLogger<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Persist the outcome of one invocation.
    ///
    /// Best-effort: a failed write is logged and reported as `None`, never as an error.
    pub async fn record(
        &self,
        prompt: &str,
        results: &[OperationResult],
        execution_time_ms: u64,
        automation_id: Option<&str>,
    ) -> Option<Uuid> {
        let success_count = results.iter().filter(|r| r.is_success()).count() as i64;
        let error_count = results.len() as i64 - success_count;

        let operations = match serde_json::to_string(results) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!("[AUDIT] Could not serialize results: {}", e);
                return None;
            }
        };

        let data = CreateAutomationLog {
            prompt: prompt.to_string(),
            success: !results.is_empty() && error_count == 0,
            operations_count: results.len() as i64,
            success_count,
            error_count,
            operations,
            execution_time_ms: i64::try_from(execution_time_ms).unwrap_or(i64::MAX),
            automation_id: automation_id.map(str::to_string),
        };

        match AutomationLog::create(self.pool, &data, Uuid::new_v4()).await {
            Ok(log) => {
                tracing::info!(
                    "[AUDIT] Logged invocation {} ({} ok, {} failed)",
                    log.id,
                    success_count,
                    error_count
                );
                Some(log.id)
            }
            Err(e) => {
                tracing::warn!("[AUDIT] Failed to write audit record: {}", e);
                None
            }
        }
    }

    /// Record an invocation that failed before any operation ran.
    pub async fn record_failure(
        &self,
        prompt: &str,
        stage: &str,
        error: &str,
        execution_time_ms: u64,
        automation_id: Option<&str>,
    ) -> Option<Uuid> {
        let synthesized = [OperationResult::failure(stage, error)];
        self.record(prompt, &synthesized, execution_time_ms, automation_id)
            .await
    }
}
