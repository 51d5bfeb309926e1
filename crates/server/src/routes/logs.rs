use axum::{
    Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::get,
};
use chrono::{DateTime, Utc};
use db::models::automation_log::AutomationLog;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::{AppState, error::ApiError, response::ApiResponse};

const DEFAULT_LIMIT: i64 = 20;
const MAX_LIMIT: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    limit: Option<i64>,
}

/// Audit record with its `operations` column decoded
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub id: Uuid,
    pub prompt: String,
    pub success: bool,
    pub operations_count: i64,
    pub success_count: i64,
    pub error_count: i64,
    pub operations: Value,
    pub execution_time_ms: i64,
    pub automation_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<AutomationLog> for LogEntry {
    fn from(log: AutomationLog) -> Self {
        let operations = log.operations_json();
        Self {
            id: log.id,
            prompt: log.prompt,
            success: log.success,
            operations_count: log.operations_count,
            success_count: log.success_count,
            error_count: log.error_count,
            operations,
            execution_time_ms: log.execution_time_ms,
            automation_id: log.automation_id,
            created_at: log.created_at,
        }
    }
}

pub async fn list_logs(
    State(state): State<AppState>,
    Query(query): Query<LogsQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<LogEntry>>>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let logs = AutomationLog::find_recent(&state.db.pool, limit).await?;
    Ok(ResponseJson(ApiResponse::success(
        logs.into_iter().map(LogEntry::from).collect(),
    )))
}

pub async fn get_log(
    State(state): State<AppState>,
    Path(log_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<LogEntry>>, ApiError> {
    let log = AutomationLog::find_by_id(&state.db.pool, log_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Automation log {} not found", log_id)))?;
    Ok(ResponseJson(ApiResponse::success(log.into())))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/command/logs", get(list_logs))
        .route("/command/logs/{log_id}", get(get_log))
}
