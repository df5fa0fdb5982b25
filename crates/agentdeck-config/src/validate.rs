//! Post-load configuration validation.

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
const LOG_FORMATS: &[&str] = &["pretty", "compact", "json", "full"];

/// Validate a fully loaded configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_approvals(config)?;
    validate_model(config)?;
    validate_runtime(config)?;
    validate_logging(config)?;
    Ok(())
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.to_owned(),
        message: message.into(),
    }
}

fn validate_approvals(config: &Config) -> ConfigResult<()> {
    if config
        .approvals
        .interactive_tools
        .iter()
        .any(|t| t.trim().is_empty())
    {
        return Err(invalid(
            "approvals.interactive_tools",
            "tool names must not be empty",
        ));
    }
    Ok(())
}

fn validate_model(config: &Config) -> ConfigResult<()> {
    if config.model.default.trim().is_empty() {
        return Err(invalid("model.default", "model name must not be empty"));
    }
    if config.model.context_window == 0 {
        return Err(invalid(
            "model.context_window",
            "context window must be greater than 0",
        ));
    }
    Ok(())
}

fn validate_runtime(config: &Config) -> ConfigResult<()> {
    if config.runtime.executable.trim().is_empty() {
        return Err(invalid(
            "runtime.executable",
            "executable must not be empty",
        ));
    }
    if config.runtime.stream_close_timeout_ms == 0 {
        return Err(invalid(
            "runtime.stream_close_timeout_ms",
            "stream close timeout must be greater than 0",
        ));
    }
    Ok(())
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    let level = config.logging.level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        return Err(invalid(
            "logging.level",
            format!(
                "unknown level '{}'; expected one of: {}",
                config.logging.level,
                LOG_LEVELS.join(", ")
            ),
        ));
    }
    if !LOG_FORMATS.contains(&config.logging.format.as_str()) {
        return Err(invalid(
            "logging.format",
            format!(
                "unknown format '{}'; expected one of: {}",
                config.logging.format,
                LOG_FORMATS.join(", ")
            ),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_zero_approval_timeout_is_valid() {
        let mut config = Config::default();
        config.approvals.timeout_ms = 0;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_zero_context_window_rejected() {
        let mut config = Config::default();
        config.model.context_window = 0;
        let err = validate(&config).unwrap_err();
        assert!(
            matches!(err, ConfigError::ValidationError { ref field, .. } if field == "model.context_window")
        );
    }

    #[test]
    fn test_bad_log_level_rejected() {
        let mut config = Config::default();
        config.logging.level = "loud".to_owned();
        assert!(validate(&config).is_err());

        config.logging.level = "DEBUG".to_owned();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_bad_log_format_rejected() {
        let mut config = Config::default();
        config.logging.format = "xml".to_owned();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_blank_interactive_tool_rejected() {
        let mut config = Config::default();
        config.approvals.interactive_tools.push(String::new());
        assert!(validate(&config).is_err());
    }
}
