use thiserror::Error;

/// Errors raised while building or running an action flow
#[derive(Error, Debug)]
pub enum FlowError {
    #[error("Action not found: {0}")]
    ActionNotFound(String),

    #[error("Flow package not found: {0}")]
    PackageNotFound(String),

    #[error("Flow package {0} declares no flow steps")]
    EmptyFlow(String),

    #[error("Step index {index} is used by both {first} and {second}")]
    DuplicateStepIndex {
        index: u32,
        first: String,
        second: String,
    },

    #[error("Action execution failed: {0}")]
    ActionExecutionFailed(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Context error: {0}")]
    ContextError(String),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, FlowError>;
