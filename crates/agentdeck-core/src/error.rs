//! Error types for the runtime and channel collaborators.

use thiserror::Error;

/// Errors raised by an [`AgentRuntime`](crate::AgentRuntime) binding.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The runtime process could not be started.
    #[error("Failed to spawn agent runtime: {0}")]
    Spawn(String),

    /// The runtime emitted something that violates the stream protocol.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The output stream failed mid-iteration.
    #[error("Stream error: {0}")]
    Stream(String),

    /// The runtime process exited unsuccessfully.
    #[error("Agent runtime exited with code {code:?}: {stderr}")]
    Exited {
        /// Exit code, if the process was not killed by a signal.
        code: Option<i32>,
        /// Tail of the process stderr.
        stderr: String,
    },

    /// Interrupt request could not be delivered.
    #[error("Interrupt failed: {0}")]
    Interrupt(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for runtime collaborator operations.
pub type AgentResult<T> = Result<T, AgentError>;

/// Errors raised while pushing events to a client channel.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// The client went away.
    #[error("Client channel closed")]
    Closed,

    /// The transport rejected the event.
    #[error("Failed to send event: {0}")]
    Send(String),

    /// Event could not be encoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
