//! agentdeck CLI - drive Claude sessions from a terminal or a pipe.
//!
//! Events are printed to stdout as JSON lines; permission answers are read
//! from stdin as JSON lines. Logs go to stderr.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::path::PathBuf;

use agentdeck_config::Config;
use agentdeck_core::PermissionMode;
use anyhow::Result;
use clap::{Parser, Subcommand};

mod channel;
mod commands;

use commands::{mcp, run};

/// agentdeck - session orchestration for Claude Code
#[derive(Parser)]
#[command(name = "agentdeck")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one prompt and stream its events as JSON lines
    Run {
        /// Working directory for the agent (defaults to current directory)
        #[arg(long)]
        cwd: Option<PathBuf>,

        /// Resume an existing session
        #[arg(short, long)]
        resume: Option<String>,

        /// Model to use
        #[arg(short, long)]
        model: Option<String>,

        /// Permission mode: default, acceptEdits, plan, bypassPermissions
        #[arg(long)]
        permission_mode: Option<PermissionMode>,

        /// Rule for tools that run without asking (repeatable)
        #[arg(long = "allow", value_name = "RULE")]
        allow: Vec<String>,

        /// Rule for tools that never run (repeatable)
        #[arg(long = "deny", value_name = "RULE")]
        deny: Vec<String>,

        /// Skip permission prompts (ignored in plan mode)
        #[arg(long)]
        skip_permissions: bool,

        /// Attach an image file (repeatable)
        #[arg(long = "image", value_name = "FILE")]
        images: Vec<PathBuf>,

        /// The prompt
        prompt: String,
    },

    /// Show the MCP servers a session in a directory would get
    Mcp {
        /// Directory to resolve project servers for (defaults to current directory)
        #[arg(long)]
        cwd: Option<PathBuf>,
    },
}

fn load_config(explicit: Option<&std::path::Path>) -> Result<Config> {
    match Config::load(explicit) {
        Ok(loaded) => Ok(loaded.config),
        // An explicit path that fails is fatal; a broken default file is not.
        Err(e) if explicit.is_some() => Err(e.into()),
        Err(e) => {
            eprintln!("Warning: {e}; using default configuration");
            Ok(Config::default())
        },
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    // Set up logging from config, with --verbose override.
    let log_config = match agentdeck_runtime::config_bridge::to_log_config(&config) {
        Ok(mut lc) => {
            if cli.verbose {
                "debug".clone_into(&mut lc.level);
            }
            lc
        },
        Err(e) => {
            eprintln!("Warning: {e}");
            let level = if cli.verbose { "debug" } else { "info" };
            agentdeck_telemetry::LogConfig::new(level)
        },
    };
    if let Err(e) = agentdeck_telemetry::setup_logging(&log_config) {
        eprintln!("Failed to initialize logging: {e}");
    }

    match cli.command {
        Commands::Run {
            cwd,
            resume,
            model,
            permission_mode,
            allow,
            deny,
            skip_permissions,
            images,
            prompt,
        } => {
            let args = run::RunArgs {
                cwd,
                resume,
                model,
                permission_mode,
                allow,
                deny,
                skip_permissions,
                images,
                prompt,
            };
            run::run_session(&config, args).await?;
        },
        Commands::Mcp { cwd } => {
            mcp::show_servers(&config, cwd).await?;
        },
    }

    Ok(())
}
