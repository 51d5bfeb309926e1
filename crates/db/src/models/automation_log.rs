use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

/// One record per natural-language command invocation. Rows are never updated or deleted.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomationLog {
    pub id: Uuid,
    pub prompt: String,
    pub success: bool,
    pub operations_count: i64,
    pub success_count: i64,
    pub error_count: i64,
    /// JSON array of per-operation results.
    pub operations: String,
    pub execution_time_ms: i64,
    pub automation_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateAutomationLog {
    pub prompt: String,
    pub success: bool,
    pub operations_count: i64,
    pub success_count: i64,
    pub error_count: i64,
    pub operations: String,
    pub execution_time_ms: i64,
    pub automation_id: Option<String>,
}

impl AutomationLog {
    /// Decoded `operations` column; falls back to `null` for rows that fail to parse.
    pub fn operations_json(&self) -> serde_json::Value {
        serde_json::from_str(&self.operations).unwrap_or(serde_json::Value::Null)
    }

    pub async fn create(
        pool: &SqlitePool,
        data: &CreateAutomationLog,
        log_id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, AutomationLog>(
            r#"INSERT INTO automation_logs
                (id, prompt, success, operations_count, success_count, error_count,
                 operations, execution_time_ms, automation_id)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
               RETURNING id, prompt, success, operations_count, success_count, error_count,
                         operations, execution_time_ms, automation_id, created_at"#,
        )
        .bind(log_id)
        .bind(&data.prompt)
        .bind(data.success)
        .bind(data.operations_count)
        .bind(data.success_count)
        .bind(data.error_count)
        .bind(&data.operations)
        .bind(data.execution_time_ms)
        .bind(&data.automation_id)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, AutomationLog>(
            r#"SELECT id, prompt, success, operations_count, success_count, error_count,
                      operations, execution_time_ms, automation_id, created_at
               FROM automation_logs
               WHERE id = ?"#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Newest first.
    pub async fn find_recent(pool: &SqlitePool, limit: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, AutomationLog>(
            r#"SELECT id, prompt, success, operations_count, success_count, error_count,
                      operations, execution_time_ms, automation_id, created_at
               FROM automation_logs
               ORDER BY created_at DESC, rowid DESC
               LIMIT ?"#,
        )
        .bind(limit)
        .fetch_all(pool)
        .await
    }
}
