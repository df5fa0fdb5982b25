#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
//! Configuration for agentdeck.
//!
//! # Usage
//!
//! ```rust,no_run
//! use agentdeck_config::Config;
//!
//! let loaded = Config::load(None).unwrap();
//! println!("Default model: {}", loaded.config.model.default);
//! ```
//!
//! # Precedence
//!
//! From highest to lowest priority:
//!
//! 1. **User file** (`~/.agentdeck/config.toml`, `$AGENTDECK_HOME/config.toml`,
//!    or a path given on the command line)
//! 2. **Environment variables** (`CLAUDE_TOOL_APPROVAL_TIMEOUT_MS`,
//!    `CONTEXT_WINDOW`, `AGENTDECK_*`), fallback only
//! 3. **Built-in defaults**
//!
//! # Design
//!
//! This crate has no dependencies on other internal agentdeck crates.
//! Conversion to domain types happens in `agentdeck-runtime`'s config bridge.

/// Environment variable fallback resolution.
pub mod env;
/// Configuration error types.
pub mod error;
/// Configuration file discovery and loading.
pub mod loader;
/// Configuration struct definitions.
pub mod types;
/// Configuration validation rules.
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::LoadedConfig;
pub use types::*;

impl Config {
    /// Load configuration from the user file, env fallbacks and defaults.
    ///
    /// See [`loader::load`] for the full algorithm.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file is malformed or the final
    /// configuration fails validation.
    pub fn load(explicit_path: Option<&std::path::Path>) -> ConfigResult<LoadedConfig> {
        loader::load(explicit_path)
    }

    /// Load configuration from a single file, without env fallbacks.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file cannot be read, parsed, or fails
    /// validation.
    pub fn load_file(path: &std::path::Path) -> ConfigResult<Self> {
        loader::load_file(path)
    }
}
