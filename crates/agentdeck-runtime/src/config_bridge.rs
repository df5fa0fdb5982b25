//! Bridge from `agentdeck_config::Config` to domain types.
//!
//! The config crate has no dependencies on other internal crates. This module
//! translates its sections into the types the orchestrator and the logging
//! setup consume, so the conversion happens in one place.

use std::time::Duration;

use agentdeck_config::Config;
use agentdeck_telemetry::{LogConfig, LogFormat};

use crate::config::OrchestratorConfig;
use crate::error::{RuntimeError, RuntimeResult};

/// Convert config to [`OrchestratorConfig`].
#[must_use]
pub fn to_orchestrator_config(cfg: &Config) -> OrchestratorConfig {
    OrchestratorConfig {
        approval_timeout: (cfg.approvals.timeout_ms > 0)
            .then(|| Duration::from_millis(cfg.approvals.timeout_ms)),
        interactive_tools: cfg.approvals.interactive_tools.iter().cloned().collect(),
        default_model: cfg.model.default.clone(),
        context_window: cfg.model.context_window,
        stream_close_timeout: Duration::from_millis(cfg.runtime.stream_close_timeout_ms),
        mcp_config_path: cfg.mcp.config_path.clone(),
    }
}

/// Convert config to [`LogConfig`].
///
/// # Errors
///
/// Returns [`RuntimeError::ConfigError`] if the log format is unknown.
pub fn to_log_config(cfg: &Config) -> RuntimeResult<LogConfig> {
    let format: LogFormat = cfg
        .logging
        .format
        .parse()
        .map_err(|e: agentdeck_telemetry::TelemetryError| RuntimeError::ConfigError(e.to_string()))?;

    let mut log = LogConfig::new(cfg.logging.level.to_ascii_lowercase()).with_format(format);
    for directive in &cfg.logging.directives {
        log = log.with_directive(directive.clone());
    }
    Ok(log)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_bridge() {
        let orchestrator = to_orchestrator_config(&Config::default());
        assert_eq!(orchestrator, OrchestratorConfig::default());
    }

    #[test]
    fn test_zero_timeout_disables() {
        let mut cfg = Config::default();
        cfg.approvals.timeout_ms = 0;
        cfg.approvals.interactive_tools = vec!["AskUserQuestion".into(), "Confirm".into()];
        let orchestrator = to_orchestrator_config(&cfg);
        assert_eq!(orchestrator.approval_timeout, None);
        assert!(orchestrator.is_interactive("Confirm"));
    }

    #[test]
    fn test_log_config_bridge() {
        let mut cfg = Config::default();
        cfg.logging.level = "DEBUG".into();
        cfg.logging.format = "json".into();
        cfg.logging.directives = vec!["agentdeck_runtime=trace".into()];

        let log = to_log_config(&cfg).unwrap();
        assert_eq!(log.level, "debug");
        assert_eq!(log.format, LogFormat::Json);
        assert_eq!(log.directives, vec!["agentdeck_runtime=trace"]);
    }
}
