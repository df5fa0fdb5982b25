//! The caller's per-request settings.

use std::path::PathBuf;

use agentdeck_core::PermissionMode;
use serde::{Deserialize, Serialize};

/// Settings for one orchestration run, as sent by the client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InvocationRequest {
    /// Working directory for the agent.
    pub cwd: Option<PathBuf>,
    /// Session to resume; `None` starts a new session.
    pub session_id: Option<String>,
    /// Requested permission mode.
    pub permission_mode: Option<PermissionMode>,
    /// Tool allow/deny lists and the bypass flag.
    pub tools_settings: ToolsSettings,
    /// Model override.
    pub model: Option<String>,
    /// Inline image attachments.
    pub images: Vec<ImageAttachment>,
}

impl InvocationRequest {
    /// A request rooted at `cwd`.
    #[must_use]
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self {
            cwd: Some(cwd.into()),
            ..Self::default()
        }
    }

    /// Resume `session_id`.
    #[must_use]
    pub fn resume(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Request a permission mode.
    #[must_use]
    pub fn permission_mode(mut self, mode: PermissionMode) -> Self {
        self.permission_mode = Some(mode);
        self
    }

    /// Replace the tool settings.
    #[must_use]
    pub fn tools(mut self, tools_settings: ToolsSettings) -> Self {
        self.tools_settings = tools_settings;
        self
    }

    /// Attach an image.
    #[must_use]
    pub fn image(mut self, image: ImageAttachment) -> Self {
        self.images.push(image);
        self
    }
}

/// Tool permission settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ToolsSettings {
    /// Rules for tools that run without asking.
    pub allowed_tools: Vec<String>,
    /// Rules for tools that never run.
    pub disallowed_tools: Vec<String>,
    /// Skip permission checks entirely (ignored in plan mode).
    pub skip_permissions: bool,
}

/// One inline image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageAttachment {
    /// `data:<mime>;base64,<payload>` URI.
    pub data: String,
    /// Original file name, informational.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ImageAttachment {
    /// Wrap a data URI.
    #[must_use]
    pub fn new(data: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            name: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_client_shape() {
        let request: InvocationRequest = serde_json::from_value(json!({
            "cwd": "/repo",
            "sessionId": "abc",
            "permissionMode": "plan",
            "toolsSettings": {"allowedTools": ["Read"], "skipPermissions": true},
            "images": [{"data": "data:image/png;base64,AA=="}],
        }))
        .unwrap();

        assert_eq!(request.cwd, Some(PathBuf::from("/repo")));
        assert_eq!(request.session_id.as_deref(), Some("abc"));
        assert_eq!(request.permission_mode, Some(PermissionMode::Plan));
        assert_eq!(request.tools_settings.allowed_tools, vec!["Read"]);
        assert!(request.tools_settings.disallowed_tools.is_empty());
        assert!(request.tools_settings.skip_permissions);
        assert_eq!(request.images.len(), 1);
        assert!(request.model.is_none());
    }

    #[test]
    fn test_empty_object() {
        let request: InvocationRequest = serde_json::from_value(json!({})).unwrap();
        assert_eq!(request, InvocationRequest::default());
    }
}
