//! Runtime error types.

use agentdeck_core::{AgentError, ChannelError};
use thiserror::Error;

/// Errors that end a session run.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The agent runtime failed to start or its stream failed.
    #[error("Agent runtime error: {0}")]
    AgentError(#[from] AgentError),

    /// The client channel rejected an event.
    #[error("Client channel error: {0}")]
    ChannelError(#[from] ChannelError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
