//! Command line and environment for the `claude` process.

use agentdeck_core::RuntimeOptions;
use serde_json::json;

/// Child-only environment variable carrying the interactive-tool keepalive.
pub const STREAM_CLOSE_TIMEOUT_ENV: &str = "CLAUDE_CODE_STREAM_CLOSE_TIMEOUT";

/// Arguments for one invocation.
///
/// The prompt is not among them; it is written to stdin as a `user` message.
#[must_use]
pub fn build_args(options: &RuntimeOptions, has_gate: bool) -> Vec<String> {
    let mut args: Vec<String> = [
        "--output-format",
        "stream-json",
        "--verbose",
        "--input-format",
        "stream-json",
    ]
    .iter()
    .map(ToString::to_string)
    .collect();

    if !options.model.is_empty() {
        args.push("--model".to_string());
        args.push(options.model.clone());
    }
    if let Some(mode) = options.permission_mode {
        args.push("--permission-mode".to_string());
        args.push(mode.as_str().to_string());
    }
    if !options.allowed_tools.is_empty() {
        args.push("--allowedTools".to_string());
        args.push(options.allowed_tools.join(","));
    }
    if !options.disallowed_tools.is_empty() {
        args.push("--disallowedTools".to_string());
        args.push(options.disallowed_tools.join(","));
    }
    if let Some(resume) = &options.resume {
        args.push("--resume".to_string());
        args.push(resume.clone());
    }
    if !options.setting_sources.is_empty() {
        let sources: Vec<&str> = options.setting_sources.iter().map(|s| s.as_str()).collect();
        args.push("--setting-sources".to_string());
        args.push(sources.join(","));
    }
    if let Some(servers) = &options.mcp_servers {
        args.push("--mcp-config".to_string());
        args.push(json!({ "mcpServers": servers }).to_string());
    }
    if has_gate {
        args.push("--permission-prompt-tool".to_string());
        args.push("stdio".to_string());
    }
    args
}

/// Environment overrides for the child process.
#[must_use]
pub fn child_env(options: &RuntimeOptions) -> Vec<(&'static str, String)> {
    options
        .stream_close_timeout
        .map(|timeout| (STREAM_CLOSE_TIMEOUT_ENV, timeout.as_millis().to_string()))
        .into_iter()
        .collect()
}
