//! Orchestrator configuration.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use agentdeck_config::{
    DEFAULT_APPROVAL_TIMEOUT_MS, DEFAULT_CONTEXT_WINDOW, DEFAULT_MODEL,
    DEFAULT_STREAM_CLOSE_TIMEOUT_MS,
};

/// Tool that always asks a human and never times out.
pub const ASK_USER_QUESTION: &str = "AskUserQuestion";

/// Configuration for the session orchestrator.
///
/// Passed in at construction; never read from the process environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// How long a permission question waits. `None` waits indefinitely.
    pub approval_timeout: Option<Duration>,
    /// Tools that always go to a human, bypassing rules and the timeout.
    pub interactive_tools: HashSet<String>,
    /// Model used when a request names none.
    pub default_model: String,
    /// Context-window size reported as the token budget total.
    pub context_window: u64,
    /// Keepalive handed to the runtime for interactive-tool streams.
    pub stream_close_timeout: Duration,
    /// Server-definition file; `~/.claude.json` when `None`.
    pub mcp_config_path: Option<PathBuf>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            approval_timeout: Some(Duration::from_millis(DEFAULT_APPROVAL_TIMEOUT_MS)),
            interactive_tools: HashSet::from([ASK_USER_QUESTION.to_string()]),
            default_model: DEFAULT_MODEL.to_string(),
            context_window: DEFAULT_CONTEXT_WINDOW,
            stream_close_timeout: Duration::from_millis(DEFAULT_STREAM_CLOSE_TIMEOUT_MS),
            mcp_config_path: None,
        }
    }
}

impl OrchestratorConfig {
    /// Set the approval timeout in milliseconds; 0 disables it.
    #[must_use]
    pub fn with_approval_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.approval_timeout = (timeout_ms > 0).then(|| Duration::from_millis(timeout_ms));
        self
    }

    /// Whether `tool_name` always needs a human.
    #[must_use]
    pub fn is_interactive(&self, tool_name: &str) -> bool {
        self.interactive_tools.contains(tool_name)
    }
}
