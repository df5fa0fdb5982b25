//! The client channel collaborator and its event vocabulary.
//!
//! Every event carries a `type` discriminator and a `sessionId`. Field names are
//! camelCase on the wire.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::error::ChannelError;

/// Why a pending permission question was withdrawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CancelReason {
    /// The approval timer fired.
    Timeout,
    /// The runtime abandoned the tool-use attempt.
    Cancelled,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "timeout"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Context-window usage summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBudget {
    /// Tokens consumed so far.
    pub used: u64,
    /// Configured context window.
    pub total: u64,
}

/// Events pushed from the orchestrator to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientEvent {
    /// A tool use needs a human decision.
    #[serde(rename_all = "camelCase")]
    ClaudePermissionRequest {
        /// Correlation token for the reply.
        request_id: String,
        /// Tool the agent wants to run.
        tool_name: String,
        /// Proposed tool input.
        input: Value,
        /// Session, if known yet.
        session_id: Option<String>,
    },
    /// A previously published request was withdrawn.
    #[serde(rename_all = "camelCase")]
    ClaudePermissionCancelled {
        /// Correlation token of the withdrawn request.
        request_id: String,
        /// Why it was withdrawn.
        reason: CancelReason,
        /// Session, if known yet.
        session_id: Option<String>,
    },
    /// A brand-new session id was assigned by the runtime.
    #[serde(rename_all = "camelCase")]
    SessionCreated {
        /// The new session id.
        session_id: String,
    },
    /// One runtime message, forwarded verbatim.
    #[serde(rename_all = "camelCase")]
    ClaudeResponse {
        /// Raw runtime message.
        data: Value,
        /// Best-known session id.
        session_id: Option<String>,
    },
    /// Token usage after a `result` message.
    #[serde(rename_all = "camelCase")]
    TokenBudget {
        /// Usage summary.
        data: TokenBudget,
        /// Best-known session id.
        session_id: Option<String>,
    },
    /// The run finished normally.
    #[serde(rename_all = "camelCase")]
    ClaudeComplete {
        /// Best-known session id.
        session_id: Option<String>,
        /// Always 0 for a graceful end.
        exit_code: i32,
        /// Whether the run started a new session rather than resuming one.
        is_new_session: bool,
    },
    /// The run failed.
    #[serde(rename_all = "camelCase")]
    ClaudeError {
        /// Human-readable error.
        error: String,
        /// Best-known session id.
        session_id: Option<String>,
    },
}

impl ClientEvent {
    /// The wire `type` of this event.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ClaudePermissionRequest { .. } => "claude-permission-request",
            Self::ClaudePermissionCancelled { .. } => "claude-permission-cancelled",
            Self::SessionCreated { .. } => "session-created",
            Self::ClaudeResponse { .. } => "claude-response",
            Self::TokenBudget { .. } => "token-budget",
            Self::ClaudeComplete { .. } => "claude-complete",
            Self::ClaudeError { .. } => "claude-error",
        }
    }

    /// The session id the event is tagged with.
    #[must_use]
    pub fn session_id(&self) -> Option<&str> {
        match self {
            Self::SessionCreated { session_id } => Some(session_id),
            Self::ClaudePermissionRequest { session_id, .. }
            | Self::ClaudePermissionCancelled { session_id, .. }
            | Self::ClaudeResponse { session_id, .. }
            | Self::TokenBudget { session_id, .. }
            | Self::ClaudeComplete { session_id, .. }
            | Self::ClaudeError { session_id, .. } => session_id.as_deref(),
        }
    }

    /// Whether this event ends a run.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::ClaudeComplete { .. } | Self::ClaudeError { .. })
    }
}

/// The client's answer to a `claude-permission-request`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionResponse {
    /// Correlation token from the request.
    pub request_id: String,
    /// Whether the tool may run.
    #[serde(default)]
    pub allow: bool,
    /// Replacement tool input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_input: Option<Value>,
    /// Denial message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Rule to add to the session allow-list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remember_entry: Option<String>,
}

/// A bidirectional client connection, seen from the server side.
#[async_trait]
pub trait ClientChannel: Send + Sync {
    /// Push one event to the client.
    ///
    /// # Errors
    ///
    /// Returns an error if the client is gone or the transport fails.
    async fn send(&self, event: ClientEvent) -> Result<(), ChannelError>;

    /// Tell the transport which session it now belongs to.
    fn set_session_id(&self, _session_id: &str) {}
}

/// Shared client channel.
pub type ArcChannel = Arc<dyn ClientChannel>;

#[async_trait]
impl ClientChannel for mpsc::Sender<ClientEvent> {
    async fn send(&self, event: ClientEvent) -> Result<(), ChannelError> {
        mpsc::Sender::send(self, event)
            .await
            .map_err(|_| ChannelError::Closed)
    }
}

#[async_trait]
impl ClientChannel for mpsc::UnboundedSender<ClientEvent> {
    async fn send(&self, event: ClientEvent) -> Result<(), ChannelError> {
        mpsc::UnboundedSender::send(self, event).map_err(|_| ChannelError::Closed)
    }
}
