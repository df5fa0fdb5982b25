//! Show the MCP server definitions a session would receive.

use std::path::PathBuf;

use agentdeck_config::Config;
use agentdeck_mcp::McpConfigLoader;
use anyhow::{Context, Result};

/// Print the merged server map for `cwd` as pretty JSON.
pub(crate) async fn show_servers(config: &Config, cwd: Option<PathBuf>) -> Result<()> {
    let loader = match &config.mcp.config_path {
        Some(path) => McpConfigLoader::new(path),
        None => McpConfigLoader::from_home()?,
    };
    let cwd = match cwd {
        Some(cwd) => cwd,
        None => std::env::current_dir().context("Failed to read current directory")?,
    };

    match loader.try_load(&cwd).await? {
        Some(servers) => {
            println!("{}", serde_json::to_string_pretty(&servers)?);
        },
        None => {
            eprintln!(
                "No MCP servers configured for {} in {}",
                cwd.display(),
                loader.path().display()
            );
        },
    }
    Ok(())
}
