//! The per-session tool-use gate.
//!
//! Installed on every query as its [`CanUseTool`] callback. Rule-covered calls
//! are answered immediately; everything else becomes a pending approval that a
//! human answers through the client channel. Every branch resolves to allow or
//! deny.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use agentdeck_approval::{Decision, PendingApprovals, RequestId, ToolRules, WaitOptions};
use agentdeck_core::{
    ArcChannel, CanUseTool, ClientEvent, PermissionMode, PermissionResult, RuntimeOptions,
    ToolUseContext,
};
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, warn};

/// Denial for calls matching a disallowed rule.
pub const BLOCKED_BY_SETTINGS: &str = "Blocked by permission settings";
/// Denial when nobody answered in time.
pub const REQUEST_TIMED_OUT: &str = "Permission request timed out";
/// Denial when the runtime abandoned the attempt.
pub const REQUEST_CANCELLED: &str = "Permission request cancelled";
/// Denial when the human refused without a message.
pub const USER_DENIED: &str = "User denied tool use";

/// Best-known session id, shared between the stream loop and the gate.
#[derive(Debug, Default)]
pub(crate) struct SessionIdCell(Mutex<Option<String>>);

impl SessionIdCell {
    pub(crate) fn new(initial: Option<String>) -> Self {
        Self(Mutex::new(initial))
    }

    fn lock(&self) -> MutexGuard<'_, Option<String>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn get(&self) -> Option<String> {
        self.lock().clone()
    }

    pub(crate) fn set(&self, session_id: &str) {
        *self.lock() = Some(session_id.to_string());
    }
}

/// Tool gate for one session.
pub(crate) struct ToolGate {
    approvals: Arc<PendingApprovals>,
    channel: ArcChannel,
    session_id: Arc<SessionIdCell>,
    mode: PermissionMode,
    rules: Mutex<ToolRules>,
    interactive_tools: HashSet<String>,
    approval_timeout: Option<Duration>,
}

impl ToolGate {
    pub(crate) fn new(
        options: &RuntimeOptions,
        approvals: Arc<PendingApprovals>,
        channel: ArcChannel,
        session_id: Arc<SessionIdCell>,
        interactive_tools: HashSet<String>,
        approval_timeout: Option<Duration>,
    ) -> Self {
        Self {
            approvals,
            channel,
            session_id,
            mode: options.effective_permission_mode(),
            rules: Mutex::new(ToolRules::new(
                options.allowed_tools.clone(),
                options.disallowed_tools.clone(),
            )),
            interactive_tools,
            approval_timeout,
        }
    }

    fn rules(&self) -> MutexGuard<'_, ToolRules> {
        self.rules.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Live rules, including anything remembered this session.
    #[cfg(test)]
    pub(crate) fn snapshot_rules(&self) -> ToolRules {
        self.rules().clone()
    }

    /// Answer from mode and rules alone, if they settle it.
    fn check_rules(&self, tool_name: &str, input: &Value) -> Option<PermissionResult> {
        if self.mode == PermissionMode::BypassPermissions {
            return Some(PermissionResult::allow(input.clone()));
        }

        let rules = self.rules();
        if let Some(rule) = rules.denied_by(tool_name, input) {
            debug!(tool = tool_name, rule, "Tool use blocked by rule");
            return Some(PermissionResult::deny(BLOCKED_BY_SETTINGS));
        }
        if let Some(rule) = rules.allowed_by(tool_name, input) {
            debug!(tool = tool_name, rule, "Tool use allowed by rule");
            return Some(PermissionResult::allow(input.clone()));
        }
        None
    }

    async fn ask_human(
        &self,
        tool_name: &str,
        input: &Value,
        context: ToolUseContext,
        interactive: bool,
    ) -> Decision {
        let request_id = RequestId::new().to_string();
        let timeout = if interactive {
            None
        } else {
            self.approval_timeout
        };

        // Registered before publishing so a fast answer cannot be lost.
        let pending = self.approvals.register(
            request_id.clone(),
            WaitOptions {
                timeout,
                signal: Some(context.signal),
            },
        );

        info!(request_id = %request_id, tool = tool_name, "Asking for tool-use permission");
        let request = ClientEvent::ClaudePermissionRequest {
            request_id: request_id.clone(),
            tool_name: tool_name.to_string(),
            input: input.clone(),
            session_id: self.session_id.get(),
        };
        if let Err(e) = self.channel.send(request).await {
            warn!(request_id = %request_id, error = %e, "Could not publish permission request");
            drop(pending);
            return Decision::Cancelled;
        }

        let channel = Arc::clone(&self.channel);
        let session_id = Arc::clone(&self.session_id);
        pending
            .wait(|reason| async move {
                let event = ClientEvent::ClaudePermissionCancelled {
                    request_id: request_id.clone(),
                    reason,
                    session_id: session_id.get(),
                };
                if let Err(e) = channel.send(event).await {
                    warn!(request_id = %request_id, error = %e, "Could not publish permission cancellation");
                }
            })
            .await
    }

    fn interpret(&self, tool_name: &str, decision: Decision, input: Value) -> PermissionResult {
        match decision {
            Decision::TimedOut => PermissionResult::deny(REQUEST_TIMED_OUT),
            Decision::Cancelled => PermissionResult::deny(REQUEST_CANCELLED),
            Decision::Allow {
                updated_input,
                remember_entry,
            } => {
                if let Some(entry) = remember_entry {
                    self.rules().remember(&entry);
                }
                debug!(tool = tool_name, "Tool use allowed by user");
                PermissionResult::allow(updated_input.unwrap_or(input))
            },
            Decision::Deny { message } => {
                debug!(tool = tool_name, "Tool use denied by user");
                PermissionResult::deny(message.unwrap_or_else(|| USER_DENIED.to_string()))
            },
        }
    }
}

#[async_trait]
impl CanUseTool for ToolGate {
    async fn can_use_tool(
        &self,
        tool_name: &str,
        input: Value,
        context: ToolUseContext,
    ) -> PermissionResult {
        let interactive = self.interactive_tools.contains(tool_name);
        if !interactive && let Some(result) = self.check_rules(tool_name, &input) {
            return result;
        }

        let decision = self.ask_human(tool_name, &input, context, interactive).await;
        self.interpret(tool_name, decision, input)
    }
}
