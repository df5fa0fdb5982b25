//! Subcommand implementations.

pub(crate) mod mcp;
pub(crate) mod run;
