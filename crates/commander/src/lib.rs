//! # Commander
//!
//! Turns one free-form instruction into an ordered plan of project, team and
//! task operations, previews or executes it, and writes an audit record.

pub mod audit;
pub mod brain;
pub mod catalog;
pub mod config;
pub mod executor;
pub mod expansion;
pub mod operations;
pub mod orchestrator;
pub mod resolver;
pub mod service;

#[cfg(test)]
mod service_tests;
#[cfg(test)]
pub(crate) mod test_utils;

pub use audit::AuditLogger;
pub use brain::{build_provider, LLMProviderTrait, ProviderError, ToolCall};
pub use catalog::{OperationKind, OperationSpec};
pub use config::{CommandConfig, LLMConfig};
pub use executor::{ExecutionContext, ExecutionEngine, OperationResult, OperationStatus};
pub use expansion::PreviewEntry;
pub use operations::{Operation, OperationError};
pub use resolver::EntityDictionary;
pub use service::{CommandRequest, CommandResponse, CommandService, ResponseOperations};

/// Errors that abort a whole invocation before any mutation happens
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, CommandError>;
