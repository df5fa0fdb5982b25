//! MCP server definition loading.
//!
//! Definitions are read from `~/.claude.json`:
//!
//! ```json
//! {
//!   "mcpServers": { "github": { "command": "gh-mcp" } },
//!   "projects": {
//!     "/home/me/repo": { "mcpServers": { "db": { "command": "db-mcp" } } }
//!   }
//! }
//! ```

use std::path::{Path, PathBuf};

use agentdeck_core::ServerDefinitions;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{McpError, McpResult};

/// Default definition file name, relative to the home directory.
pub const DEFAULT_FILE_NAME: &str = ".claude.json";

/// Loads server definitions for a working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct McpConfigLoader {
    path: PathBuf,
}

impl McpConfigLoader {
    /// Loader reading `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Loader reading `~/.claude.json`.
    ///
    /// # Errors
    ///
    /// Returns [`McpError::NoHomeDir`] if the home directory is unknown.
    pub fn from_home() -> McpResult<Self> {
        let home = directories::BaseDirs::new()
            .map(|d| d.home_dir().to_path_buf())
            .ok_or(McpError::NoHomeDir)?;
        Ok(Self::new(home.join(DEFAULT_FILE_NAME)))
    }

    /// The file this loader reads.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Server definitions for `cwd`, or `None` if there are none.
    ///
    /// A missing or malformed file is logged and treated as "no servers".
    pub async fn load(&self, cwd: &Path) -> Option<ServerDefinitions> {
        match self.try_load(cwd).await {
            Ok(servers) => servers,
            Err(e) => {
                warn!(error = %e, "Ignoring MCP server config");
                None
            },
        }
    }

    /// Like [`load`](Self::load), but reports read and parse failures.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn try_load(&self, cwd: &Path) -> McpResult<Option<ServerDefinitions>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "MCP config not found, skipping");
                return Ok(None);
            },
            Err(e) => {
                return Err(McpError::Read {
                    path: self.path.display().to_string(),
                    source: e,
                });
            },
        };

        let root: Value = serde_json::from_str(&content).map_err(|e| McpError::Parse {
            path: self.path.display().to_string(),
            source: e,
        })?;

        let servers = merge_servers(&root, &cwd.to_string_lossy());
        if servers.is_empty() {
            return Ok(None);
        }
        debug!(
            count = servers.len(),
            cwd = %cwd.display(),
            "Loaded MCP server definitions"
        );
        Ok(Some(servers))
    }
}

/// Merge the global `mcpServers` map with `projects[cwd].mcpServers`.
///
/// Project entries replace global entries with the same name. Non-object
/// sections are ignored.
#[must_use]
pub fn merge_servers(root: &Value, cwd: &str) -> ServerDefinitions {
    let mut merged = ServerDefinitions::new();

    if let Some(global) = root.get("mcpServers").and_then(Value::as_object) {
        merged.extend(global.iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    let project = root
        .get("projects")
        .and_then(|projects| projects.get(cwd))
        .and_then(|project| project.get("mcpServers"))
        .and_then(Value::as_object);
    if let Some(project) = project {
        merged.extend(project.iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    merged
}
