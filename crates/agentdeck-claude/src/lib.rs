//! agentdeck Claude - the Claude Code CLI as an [`AgentRuntime`](agentdeck_core::AgentRuntime).
//!
//! Each query spawns `claude --output-format stream-json --input-format stream-json`,
//! writes the prompt to stdin, and streams stdout back one JSON object per
//! message. Tool permission questions arrive as `control_request`s and are
//! answered through the query's [`CanUseTool`](agentdeck_core::CanUseTool) gate.
//!
//! The interactive-tool keepalive from
//! [`RuntimeOptions::stream_close_timeout`](agentdeck_core::RuntimeOptions) is
//! exported only into the child's environment.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod args;
pub mod protocol;
mod runtime;

pub use args::{STREAM_CLOSE_TIMEOUT_ENV, build_args, child_env};
pub use runtime::{ClaudeCliRuntime, DEFAULT_EXECUTABLE};
