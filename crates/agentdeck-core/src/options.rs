//! Runtime invocation options.
//!
//! [`RuntimeOptions`] is the configuration shape a runtime binding consumes. It
//! is produced per request by the option mapper in `agentdeck-runtime` and is
//! never shared across sessions.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Auxiliary tool-server definitions, keyed by server name.
///
/// The values are opaque to agentdeck and handed to the runtime verbatim.
pub type ServerDefinitions = serde_json::Map<String, Value>;

/// Identifier of the built-in tool and system-prompt presets.
pub const CLAUDE_CODE_PRESET: &str = "claude_code";

/// How the runtime treats tool-use attempts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PermissionMode {
    /// Ask for anything not covered by a rule.
    #[default]
    Default,
    /// Auto-accept file edits.
    AcceptEdits,
    /// Skip all permission checks.
    BypassPermissions,
    /// Read-only planning mode.
    Plan,
}

impl PermissionMode {
    /// Wire name of the mode.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::AcceptEdits => "acceptEdits",
            Self::BypassPermissions => "bypassPermissions",
            Self::Plan => "plan",
        }
    }
}

impl fmt::Display for PermissionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PermissionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(Self::Default),
            "acceptEdits" => Ok(Self::AcceptEdits),
            "bypassPermissions" => Ok(Self::BypassPermissions),
            "plan" => Ok(Self::Plan),
            other => Err(format!(
                "unknown permission mode '{other}'; expected one of: default, acceptEdits, bypassPermissions, plan"
            )),
        }
    }
}

/// A `{ "type": "preset", "preset": <name> }` selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preset {
    /// Always `"preset"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Preset name.
    pub preset: String,
}

impl Preset {
    /// The full built-in preset.
    #[must_use]
    pub fn claude_code() -> Self {
        Self {
            kind: "preset".to_string(),
            preset: CLAUDE_CODE_PRESET.to_string(),
        }
    }
}

/// A location instruction/settings files are loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettingSource {
    /// Project-level (`<cwd>/.claude`).
    Project,
    /// User-level (`~/.claude`).
    User,
    /// Local, uncommitted overrides.
    Local,
}

impl SettingSource {
    /// All sources, in load order.
    pub const ALL: [Self; 3] = [Self::Project, Self::User, Self::Local];

    /// Wire name of the source.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::User => "user",
            Self::Local => "local",
        }
    }
}

/// Configuration for one runtime invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeOptions {
    /// Working directory for the agent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cwd: Option<PathBuf>,
    /// Permission mode; `None` means the runtime default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permission_mode: Option<PermissionMode>,
    /// Rules for tools that may run without asking.
    pub allowed_tools: Vec<String>,
    /// Rules for tools that must never run.
    pub disallowed_tools: Vec<String>,
    /// Tool surface selector.
    pub tools: Preset,
    /// System prompt selector.
    pub system_prompt: Preset,
    /// Where instruction files are loaded from.
    pub setting_sources: Vec<SettingSource>,
    /// Model identifier.
    pub model: String,
    /// Session to resume.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resume: Option<String>,
    /// Auxiliary tool servers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mcp_servers: Option<ServerDefinitions>,
    /// Keepalive for interactive-tool streams, read by the binding when it
    /// constructs the runtime process.
    #[serde(skip)]
    pub stream_close_timeout: Option<Duration>,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            cwd: None,
            permission_mode: None,
            allowed_tools: Vec::new(),
            disallowed_tools: Vec::new(),
            tools: Preset::claude_code(),
            system_prompt: Preset::claude_code(),
            setting_sources: SettingSource::ALL.to_vec(),
            model: String::new(),
            resume: None,
            mcp_servers: None,
            stream_close_timeout: None,
        }
    }
}

impl RuntimeOptions {
    /// The mode the runtime will actually apply.
    #[must_use]
    pub fn effective_permission_mode(&self) -> PermissionMode {
        self.permission_mode.unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_mode_round_trip_names() {
        for mode in [
            PermissionMode::Default,
            PermissionMode::AcceptEdits,
            PermissionMode::BypassPermissions,
            PermissionMode::Plan,
        ] {
            assert_eq!(mode.as_str().parse::<PermissionMode>().unwrap(), mode);
            assert_eq!(
                serde_json::to_value(mode).unwrap(),
                serde_json::json!(mode.as_str())
            );
        }
    }

    #[test]
    fn test_unknown_permission_mode() {
        let err = "yolo".parse::<PermissionMode>().unwrap_err();
        assert!(err.contains("yolo"));
    }

    #[test]
    fn test_preset_shape() {
        let json = serde_json::to_value(Preset::claude_code()).unwrap();
        assert_eq!(json, serde_json::json!({"type": "preset", "preset": "claude_code"}));
    }

    #[test]
    fn test_options_serialize_skips_unset() {
        let opts = RuntimeOptions {
            cwd: None,
            permission_mode: None,
            allowed_tools: vec![],
            disallowed_tools: vec![],
            tools: Preset::claude_code(),
            system_prompt: Preset::claude_code(),
            setting_sources: SettingSource::ALL.to_vec(),
            model: "sonnet".to_string(),
            resume: None,
            mcp_servers: None,
            stream_close_timeout: Some(Duration::from_secs(1)),
        };
        let json = serde_json::to_value(&opts).unwrap();
        assert!(json.get("resume").is_none());
        assert!(json.get("permissionMode").is_none());
        assert!(json.get("streamCloseTimeout").is_none());
        assert_eq!(json["settingSources"], serde_json::json!(["project", "user", "local"]));
        assert_eq!(opts.effective_permission_mode(), PermissionMode::Default);
    }
}
