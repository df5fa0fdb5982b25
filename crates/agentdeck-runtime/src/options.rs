//! Translation of an [`InvocationRequest`] into [`RuntimeOptions`].

use agentdeck_core::{PermissionMode, Preset, RuntimeOptions, SettingSource};

use crate::config::OrchestratorConfig;
use crate::request::InvocationRequest;

/// Read-only and planning tools granted in plan mode.
pub const PLAN_MODE_TOOLS: [&str; 7] = [
    "Read",
    "Task",
    "exit_plan_mode",
    "TodoRead",
    "TodoWrite",
    "WebFetch",
    "WebSearch",
];

/// Build fresh runtime options for one request.
///
/// Pure: no I/O, and `request` is left untouched. Server definitions are not
/// attached here.
#[must_use]
pub fn build_options(request: &InvocationRequest, config: &OrchestratorConfig) -> RuntimeOptions {
    let settings = &request.tools_settings;
    let requested = request.permission_mode.unwrap_or_default();

    // Plan mode wins over the bypass flag.
    let mode = if settings.skip_permissions && requested != PermissionMode::Plan {
        PermissionMode::BypassPermissions
    } else {
        requested
    };

    let mut allowed_tools = settings.allowed_tools.clone();
    if mode == PermissionMode::Plan {
        for tool in PLAN_MODE_TOOLS {
            if !allowed_tools.iter().any(|t| t == tool) {
                allowed_tools.push(tool.to_string());
            }
        }
    }

    RuntimeOptions {
        cwd: request.cwd.clone(),
        permission_mode: (mode != PermissionMode::Default).then_some(mode),
        allowed_tools,
        disallowed_tools: settings.disallowed_tools.clone(),
        tools: Preset::claude_code(),
        system_prompt: Preset::claude_code(),
        setting_sources: SettingSource::ALL.to_vec(),
        model: request
            .model
            .clone()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| config.default_model.clone()),
        resume: request.session_id.clone(),
        mcp_servers: None,
        stream_close_timeout: Some(config.stream_close_timeout),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::ToolsSettings;
    use std::path::PathBuf;

    fn config() -> OrchestratorConfig {
        OrchestratorConfig::default()
    }

    #[test]
    fn test_defaults() {
        let options = build_options(&InvocationRequest::default(), &config());

        assert_eq!(options.permission_mode, None);
        assert!(options.allowed_tools.is_empty());
        assert!(options.disallowed_tools.is_empty());
        assert_eq!(options.model, "sonnet");
        assert_eq!(options.tools, Preset::claude_code());
        assert_eq!(options.system_prompt, Preset::claude_code());
        assert_eq!(
            options.setting_sources,
            vec![SettingSource::Project, SettingSource::User, SettingSource::Local]
        );
        assert!(options.resume.is_none());
        assert!(options.cwd.is_none());
        assert!(options.mcp_servers.is_none());
    }

    #[test]
    fn test_copies_request_fields() {
        let mut request = InvocationRequest::new("/repo").resume("sess-1").tools(ToolsSettings {
            allowed_tools: vec!["Read".into()],
            disallowed_tools: vec!["Bash(rm:*)".into()],
            skip_permissions: false,
        });
        request.model = Some("opus".into());

        let options = build_options(&request, &config());
        assert_eq!(options.cwd, Some(PathBuf::from("/repo")));
        assert_eq!(options.resume.as_deref(), Some("sess-1"));
        assert_eq!(options.model, "opus");
        assert_eq!(options.allowed_tools, vec!["Read"]);
        assert_eq!(options.disallowed_tools, vec!["Bash(rm:*)"]);
    }

    #[test]
    fn test_explicit_default_mode_left_unset() {
        let request = InvocationRequest::default().permission_mode(PermissionMode::Default);
        assert_eq!(build_options(&request, &config()).permission_mode, None);

        let request = InvocationRequest::default().permission_mode(PermissionMode::AcceptEdits);
        assert_eq!(
            build_options(&request, &config()).permission_mode,
            Some(PermissionMode::AcceptEdits)
        );
    }

    #[test]
    fn test_plan_mode_adds_tools_once() {
        let request = InvocationRequest::default()
            .permission_mode(PermissionMode::Plan)
            .tools(ToolsSettings {
                allowed_tools: vec!["Read".into(), "Grep".into()],
                ..ToolsSettings::default()
            });

        let options = build_options(&request, &config());
        assert_eq!(options.permission_mode, Some(PermissionMode::Plan));
        assert_eq!(options.allowed_tools.len(), 8);
        assert_eq!(options.allowed_tools[0], "Read");
        assert_eq!(options.allowed_tools[1], "Grep");
        for tool in PLAN_MODE_TOOLS {
            assert_eq!(options.allowed_tools.iter().filter(|t| *t == tool).count(), 1);
        }

        // Same input, same output.
        assert_eq!(build_options(&request, &config()), options);
        assert_eq!(request.tools_settings.allowed_tools, vec!["Read", "Grep"]);
    }

    #[test]
    fn test_skip_permissions_bypasses_default_mode() {
        let request = InvocationRequest::default().tools(ToolsSettings {
            skip_permissions: true,
            ..ToolsSettings::default()
        });
        assert_eq!(
            build_options(&request, &config()).permission_mode,
            Some(PermissionMode::BypassPermissions)
        );
    }

    #[test]
    fn test_plan_mode_beats_skip_permissions() {
        let request = InvocationRequest::default()
            .permission_mode(PermissionMode::Plan)
            .tools(ToolsSettings {
                skip_permissions: true,
                ..ToolsSettings::default()
            });
        assert_eq!(
            build_options(&request, &config()).permission_mode,
            Some(PermissionMode::Plan)
        );
    }

    #[test]
    fn test_stream_close_timeout_from_config() {
        let options = build_options(&InvocationRequest::default(), &config());
        assert_eq!(
            options.stream_close_timeout,
            Some(config().stream_close_timeout)
        );
    }
}
