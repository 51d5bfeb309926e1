use std::sync::Arc;

use commander::CommandService;
use db::DBService;

use crate::middleware::FixedWindowLimiter;

pub mod error;
pub mod middleware;
pub mod response;
pub mod routes;

#[cfg(test)]
pub(crate) mod test_utils;

/// Shared handles for every request handler
#[derive(Clone)]
pub struct AppState {
    pub db: DBService,
    pub command: Arc<CommandService>,
    pub limiter: Arc<FixedWindowLimiter>,
}

impl AppState {
    pub fn new(db: DBService, command: CommandService, limiter: FixedWindowLimiter) -> Self {
        Self {
            db,
            command: Arc::new(command),
            limiter: Arc::new(limiter),
        }
    }
}
