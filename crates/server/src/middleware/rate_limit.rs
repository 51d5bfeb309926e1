use std::{
    convert::Infallible,
    net::SocketAddr,
    time::{Duration, Instant},
};

use axum::{
    Json,
    extract::{ConnectInfo, FromRequestParts},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use serde::Serialize;

/// Fixed-window limits for `POST /api/command`
#[derive(Clone, Debug)]
pub struct RateLimitConfig {
    /// Maximum requests per window and caller
    pub max_requests: u32,
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 10,
            window: Duration::from_secs(60),
        }
    }
}

impl RateLimitConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let max_requests = std::env::var("COMMAND_RATE_LIMIT_MAX")
            .ok()
            .and_then(|v| v.trim().parse::<u32>().ok())
            .unwrap_or(defaults.max_requests);
        let window = std::env::var("COMMAND_RATE_LIMIT_WINDOW_SECS")
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(defaults.window);

        Self {
            max_requests,
            window,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub remaining: u32,
    /// Time until the caller's window starts over
    pub reset_after: Duration,
}

impl RateLimitDecision {
    /// Whole seconds until reset, rounded up.
    pub fn reset_in_seconds(&self) -> u64 {
        let secs = self.reset_after.as_secs();
        if self.reset_after.subsec_nanos() > 0 {
            secs + 1
        } else {
            secs
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// Per-caller fixed-window counter
pub struct FixedWindowLimiter {
    config: RateLimitConfig,
    windows: DashMap<String, Window>,
}

impl FixedWindowLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: DashMap::new(),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    pub fn check(&self, caller: &str) -> RateLimitDecision {
        let now = Instant::now();
        let mut window = self.windows.entry(caller.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });

        if now.duration_since(window.started) >= self.config.window {
            *window = Window {
                started: now,
                count: 0,
            };
        }

        let reset_after = self
            .config
            .window
            .saturating_sub(now.duration_since(window.started));

        if window.count >= self.config.max_requests {
            tracing::warn!(
                "[RATE_LIMIT] Denied {} ({} requests in window, resets in {:?})",
                caller,
                window.count,
                reset_after
            );
            return RateLimitDecision {
                allowed: false,
                remaining: 0,
                reset_after,
            };
        }

        window.count += 1;
        RateLimitDecision {
            allowed: true,
            remaining: self.config.max_requests - window.count,
            reset_after,
        }
    }

    /// Drop windows that have already expired. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let before = self.windows.len();
        let window = self.config.window;
        self.windows.retain(|_, w| w.started.elapsed() < window);
        before.saturating_sub(self.windows.len())
    }
}

/// Caller identity: first `x-forwarded-for` hop, else the peer address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerId(pub String);

impl CallerId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<S> FromRequestParts<S> for CallerId
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let forwarded = parts
            .headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string);

        let caller = forwarded
            .or_else(|| {
                parts
                    .extensions
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ConnectInfo(addr)| addr.ip().to_string())
            })
            .unwrap_or_else(|| "unknown".to_string());

        Ok(CallerId(caller))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RateLimitBody {
    success: bool,
    message: String,
    reset_in_seconds: u64,
}

/// 429 response for a denied caller
pub struct RateLimitExceeded(pub RateLimitDecision);

impl IntoResponse for RateLimitExceeded {
    fn into_response(self) -> Response {
        let reset_in_seconds = self.0.reset_in_seconds();
        (
            StatusCode::TOO_MANY_REQUESTS,
            Json(RateLimitBody {
                success: false,
                message: format!(
                    "Too many commands. Please wait {} second(s) and try again.",
                    reset_in_seconds
                ),
                reset_in_seconds,
            }),
        )
            .into_response()
    }
}
