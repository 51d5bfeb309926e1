use axum::{extract::State, http::StatusCode, response::Json as ResponseJson};
use serde::Serialize;

use crate::{AppState, response::ApiResponse};

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub version: &'static str,
    pub database: bool,
}

pub async fn health_check(
    State(state): State<AppState>,
) -> (StatusCode, ResponseJson<ApiResponse<HealthStatus>>) {
    let database = match sqlx::query("SELECT 1").execute(&state.db.pool).await {
        Ok(_) => true,
        Err(e) => {
            tracing::warn!("Health check could not reach the database: {}", e);
            false
        }
    };

    let status = HealthStatus {
        status: if database { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        database,
    };
    let code = if database {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (code, ResponseJson(ApiResponse::success(status)))
}

#[cfg(test)]
mod tests {
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    use super::*;
    use crate::test_utils::{body_json, test_app};

    #[tokio::test]
    async fn test_health_reports_database() {
        let (app, _) = test_app(Vec::new()).await;

        let response = app
            .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["data"]["status"], "ok");
        assert_eq!(body["data"]["database"], true);
    }

    #[tokio::test]
    async fn test_health_degraded_when_pool_closed() {
        let (app, state) = test_app(Vec::new()).await;
        state.db.pool.close().await;

        let response = app
            .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
