use std::{net::SocketAddr, time::Duration};

use anyhow::Context;
use commander::{CommandConfig, CommandService};
use db::DBService;
use server::{
    AppState,
    middleware::{FixedWindowLimiter, RateLimitConfig},
    routes,
};
use tracing_subscriber::{EnvFilter, prelude::*};

const DEFAULT_DATABASE_PATH: &str = "./command-center.sqlite";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load `.env` if present so local development picks up API keys
    dotenv::dotenv().ok();

    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let filter_string = format!(
        "warn,server={level},commander={level},db={level}",
        level = log_level
    );
    let env_filter = EnvFilter::try_new(filter_string).context("Failed to create tracing filter")?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_filter(env_filter))
        .init();

    let database_path =
        std::env::var("DATABASE_PATH").unwrap_or_else(|_| DEFAULT_DATABASE_PATH.to_string());
    let db = DBService::new(&database_path)
        .await
        .with_context(|| format!("Failed to open database at {database_path}"))?;

    let config = CommandConfig::from_env();
    tracing::info!(
        "Reasoning backend: {} ({}), max {} round(s), default assignee {:?}",
        config.llm.provider,
        config.llm.model,
        config.max_rounds,
        config.default_assignee
    );
    let command = CommandService::from_config(db.pool.clone(), config);

    let rate_limit = RateLimitConfig::from_env();
    tracing::info!(
        "[RATE_LIMIT] {} command(s) per {:?} per caller",
        rate_limit.max_requests,
        rate_limit.window
    );
    let state = AppState::new(db, command, FixedWindowLimiter::new(rate_limit));

    // Expired windows are dropped once per window length
    let limiter = state.limiter.clone();
    tokio::spawn(async move {
        let period = limiter.config().window.max(Duration::from_secs(1));
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            let purged = limiter.purge_expired();
            if purged > 0 {
                tracing::debug!("[RATE_LIMIT] Purged {} expired window(s)", purged);
            }
        }
    });

    let app_router = routes::router(state);

    let port = std::env::var("PORT")
        .ok()
        .and_then(|s| s.trim().parse::<u16>().ok())
        .unwrap_or(3001);
    let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let listener = tokio::net::TcpListener::bind(format!("{host}:{port}"))
        .await
        .with_context(|| format!("Failed to bind to {host}:{port}"))?;

    tracing::info!("Server running on http://{}", listener.local_addr()?);

    axum::serve(
        listener,
        app_router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server failure")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
