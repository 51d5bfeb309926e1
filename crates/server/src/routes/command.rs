use axum::{
    Json, Router,
    extract::State,
    response::{IntoResponse, Response},
    routing::post,
};
use commander::CommandRequest;

use crate::{
    AppState,
    error::ApiError,
    middleware::{CallerId, RateLimitExceeded},
};

/// Rate limit first; a denied caller never reaches the pipeline or the store.
pub async fn run_command(
    State(state): State<AppState>,
    caller: CallerId,
    Json(request): Json<CommandRequest>,
) -> Result<Response, ApiError> {
    let decision = state.limiter.check(caller.as_str());
    if !decision.allowed {
        return Ok(RateLimitExceeded(decision).into_response());
    }

    tracing::debug!(
        "[COMMAND] {} has {} request(s) left in this window",
        caller.as_str(),
        decision.remaining
    );

    let response = state.command.handle(request).await?;
    Ok(Json(response).into_response())
}

pub fn router() -> Router<AppState> {
    Router::new().route("/command", post(run_command))
}
