use axum::{Router, middleware, routing::get};
use tower_http::cors::{Any, CorsLayer};

use crate::{AppState, middleware::request_id_middleware};

pub mod command;
pub mod health;
pub mod logs;

pub fn router(state: AppState) -> Router {
    let base_routes = Router::new()
        .route("/health", get(health::health_check))
        .merge(command::router())
        .merge(logs::router())
        .with_state(state);

    Router::new()
        .nest("/api", base_routes)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(middleware::from_fn(request_id_middleware))
}
