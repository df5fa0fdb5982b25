//! Configuration types for agentdeck.
//!
//! Every struct implements [`Default`] with production defaults, so a bare
//! `[section]` header (or no file at all) yields a working configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Default wait for a human tool-use decision, in milliseconds.
pub const DEFAULT_APPROVAL_TIMEOUT_MS: u64 = 55_000;
/// Default context-window budget reported in token usage.
pub const DEFAULT_CONTEXT_WINDOW: u64 = 160_000;
/// Default model identifier.
pub const DEFAULT_MODEL: &str = "sonnet";
/// Default keepalive for interactive-tool streams, in milliseconds.
pub const DEFAULT_STREAM_CLOSE_TIMEOUT_MS: u64 = 300_000;

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Tool-use approval behaviour.
    pub approvals: ApprovalsSection,
    /// Model selection and context budget.
    pub model: ModelSection,
    /// Agent runtime process settings.
    pub runtime: RuntimeSection,
    /// Auxiliary tool-server discovery.
    pub mcp: McpSection,
    /// Logging level and format.
    pub logging: LoggingSection,
}

/// `[approvals]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApprovalsSection {
    /// How long a permission question waits for a human. 0 waits forever.
    pub timeout_ms: u64,
    /// Tools that always ask a human and never time out.
    pub interactive_tools: Vec<String>,
}

impl Default for ApprovalsSection {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_APPROVAL_TIMEOUT_MS,
            interactive_tools: vec!["AskUserQuestion".to_owned()],
        }
    }
}

/// `[model]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSection {
    /// Model used when a request does not name one.
    pub default: String,
    /// Context-window size reported as the token budget total.
    pub context_window: u64,
}

impl Default for ModelSection {
    fn default() -> Self {
        Self {
            default: DEFAULT_MODEL.to_owned(),
            context_window: DEFAULT_CONTEXT_WINDOW,
        }
    }
}

/// `[runtime]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeSection {
    /// Agent CLI executable, resolved through `PATH` when not absolute.
    pub executable: String,
    /// Keepalive handed to the runtime process for interactive-tool streams.
    pub stream_close_timeout_ms: u64,
}

impl Default for RuntimeSection {
    fn default() -> Self {
        Self {
            executable: "claude".to_owned(),
            stream_close_timeout_ms: DEFAULT_STREAM_CLOSE_TIMEOUT_MS,
        }
    }
}

/// `[mcp]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct McpSection {
    /// Server-definition file; `~/.claude.json` when unset.
    pub config_path: Option<PathBuf>,
}

/// `[logging]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Global level: `trace`, `debug`, `info`, `warn` or `error`.
    pub level: String,
    /// Output format: `pretty`, `compact`, `json` or `full`.
    pub format: String,
    /// Extra per-target directives such as `agentdeck_runtime=debug`.
    pub directives: Vec<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "compact".to_owned(),
            directives: Vec::new(),
        }
    }
}
