//! Config file discovery and loading.
//!
//! Implements the `Config::load()` algorithm:
//! 1. Find the user file: an explicit path, else `~/.agentdeck/config.toml`,
//!    else `$AGENTDECK_HOME/config.toml`
//! 2. Apply env var fallbacks for fields the file left unset
//! 3. Deserialize, filling everything else from defaults
//! 4. Validate

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::env::{apply_env_fallbacks, collect_env_vars};
use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;
use crate::validate;

/// Maximum allowed config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576;

/// Name of the per-user config directory under the home directory.
pub const CONFIG_DIR_NAME: &str = ".agentdeck";

/// Env var naming an alternate config directory.
pub const HOME_ENV_VAR: &str = "AGENTDECK_HOME";

/// A loaded configuration and where it came from.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// The final configuration.
    pub config: Config,
    /// The file that was read, if any.
    pub source: Option<PathBuf>,
    /// Env vars that filled unset fields.
    pub env_applied: Vec<&'static str>,
}

/// Load configuration from the process environment.
///
/// An `explicit_path` must exist. Without one, a missing user file is not an
/// error and the defaults apply.
///
/// # Errors
///
/// Returns a [`ConfigError`] if a config file is malformed, an env var has the
/// wrong shape, or the result fails validation.
pub fn load(explicit_path: Option<&Path>) -> ConfigResult<LoadedConfig> {
    let env_vars = collect_env_vars();
    let home_dir = if explicit_path.is_some() {
        None
    } else {
        Some(home_directory()?)
    };
    load_with(explicit_path, home_dir.as_deref(), &env_vars)
}

/// Load configuration with an explicit home directory and env map.
///
/// # Errors
///
/// See [`load`].
pub fn load_with<S: ::std::hash::BuildHasher>(
    explicit_path: Option<&Path>,
    home_dir: Option<&Path>,
    env_vars: &HashMap<String, String, S>,
) -> ConfigResult<LoadedConfig> {
    let (tree, source) = match explicit_path {
        Some(path) => match try_load_file(path)? {
            Some(tree) => (Some(tree), Some(path.to_path_buf())),
            None => {
                return Err(ConfigError::ReadError {
                    path: path.display().to_string(),
                    source: std::io::Error::from(std::io::ErrorKind::NotFound),
                });
            },
        },
        None => discover(home_dir, env_vars)?,
    };

    if let Some(path) = &source {
        info!(path = %path.display(), "loaded user config");
    }

    let mut tree = tree.unwrap_or_else(|| toml::Value::Table(toml::map::Map::new()));
    let env_applied = apply_env_fallbacks(&mut tree, env_vars)?;
    if !env_applied.is_empty() {
        debug!(count = env_applied.len(), "applied environment variable fallbacks");
    }

    let origin = source
        .as_ref()
        .map_or_else(|| "<environment>".to_owned(), |p| p.display().to_string());
    let config: Config = tree
        .try_into()
        .map_err(|e: toml::de::Error| ConfigError::ParseError {
            path: origin,
            source: e,
        })?;

    validate::validate(&config)?;

    Ok(LoadedConfig {
        config,
        source,
        env_applied,
    })
}

/// Load a config from a specific file path, with no env fallbacks.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file cannot be read, parsed, or fails
/// validation.
pub fn load_file(path: &Path) -> ConfigResult<Config> {
    let content = read_bounded(path)?;
    let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.display().to_string(),
        source: e,
    })?;

    validate::validate(&config)?;
    Ok(config)
}

/// Find the user config file: `<home>/.agentdeck/config.toml`, then
/// `$AGENTDECK_HOME/config.toml`.
fn discover<S: ::std::hash::BuildHasher>(
    home_dir: Option<&Path>,
    env_vars: &HashMap<String, String, S>,
) -> ConfigResult<(Option<toml::Value>, Option<PathBuf>)> {
    if let Some(home) = home_dir {
        let user_path = home.join(CONFIG_DIR_NAME).join("config.toml");
        if let Some(tree) = try_load_file(&user_path)? {
            return Ok((Some(tree), Some(user_path)));
        }
    }

    if let Some(alt_home) = env_vars.get(HOME_ENV_VAR).filter(|v| !v.is_empty()) {
        let alt_path = PathBuf::from(alt_home).join("config.toml");
        if let Some(tree) = try_load_file(&alt_path)? {
            return Ok((Some(tree), Some(alt_path)));
        }
    }

    Ok((None, None))
}

/// Try to load a file, returning `None` if the file doesn't exist.
fn try_load_file(path: &Path) -> ConfigResult<Option<toml::Value>> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "config file not found, skipping");
            return Ok(None);
        },
        Err(e) => {
            return Err(ConfigError::ReadError {
                path: path.display().to_string(),
                source: e,
            });
        },
    };
    check_size(path, &content)?;

    let value: toml::Value = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.display().to_string(),
        source: e,
    })?;

    Ok(Some(value))
}

fn read_bounded(path: &Path) -> ConfigResult<String> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    check_size(path, &content)?;
    Ok(content)
}

fn check_size(path: &Path, content: &str) -> ConfigResult<()> {
    if content.len() as u64 > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::ValidationError {
            field: path.display().to_string(),
            message: format!(
                "config file is {} bytes, exceeding the {} byte limit",
                content.len(),
                MAX_CONFIG_FILE_SIZE
            ),
        });
    }
    Ok(())
}

/// Determine the user's home directory.
///
/// # Errors
///
/// Returns [`ConfigError::NoHomeDir`] if the platform reports none.
pub fn home_directory() -> ConfigResult<PathBuf> {
    directories::BaseDirs::new()
        .map(|d| d.home_dir().to_path_buf())
        .ok_or(ConfigError::NoHomeDir)
}
