//! Error types for MCP server definition loading.

use thiserror::Error;

/// Errors that can occur while loading server definitions.
#[derive(Debug, Error)]
pub enum McpError {
    /// The definition file exists but could not be read.
    #[error("Failed to read MCP config at {path}: {source}")]
    Read {
        /// Path of the file.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The definition file is not valid JSON.
    #[error("Failed to parse MCP config at {path}: {source}")]
    Parse {
        /// Path of the file.
        path: String,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// Could not determine home directory.
    #[error("Could not determine home directory")]
    NoHomeDir,
}

/// Result type for MCP operations.
pub type McpResult<T> = Result<T, McpError>;
