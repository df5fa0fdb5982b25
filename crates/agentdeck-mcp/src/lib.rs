//! agentdeck MCP - auxiliary tool-server discovery.
//!
//! Reads the per-user agent configuration file (`~/.claude.json` by default)
//! and produces the server definitions to inject into a runtime invocation.
//! Global `mcpServers` entries are merged with the entries of the project that
//! matches the working directory; project entries win.
//!
//! Definitions are opaque JSON and are passed to the runtime verbatim.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod config;
pub mod error;

pub use config::{McpConfigLoader, merge_servers};
pub use error::{McpError, McpResult};
