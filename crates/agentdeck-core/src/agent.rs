//! The agent runtime collaborator.
//!
//! A runtime accepts a [`QueryRequest`] and hands back a [`Query`]: an ordered,
//! pull-based stream of [`AgentMessage`]s plus a [`QueryControl`] handle used to
//! request cooperative interruption. Whenever the agent wants to use a tool, the
//! binding calls the request's [`CanUseTool`] gate and waits for its verdict.

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::error::AgentError;
use crate::message::AgentMessage;
use crate::options::RuntimeOptions;

/// Ordered stream of runtime output.
pub type MessageStream = BoxStream<'static, Result<AgentMessage, AgentError>>;

/// Per-attempt context handed to the tool gate.
#[derive(Debug, Clone, Default)]
pub struct ToolUseContext {
    /// Fires when the runtime abandons this particular tool-use attempt.
    ///
    /// Scoped to one attempt; unrelated to session-wide abort.
    pub signal: CancellationToken,
}

impl ToolUseContext {
    /// Create a context bound to `signal`.
    #[must_use]
    pub fn new(signal: CancellationToken) -> Self {
        Self { signal }
    }
}

/// The gate's verdict on one tool-use attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "behavior", rename_all = "lowercase")]
pub enum PermissionResult {
    /// Run the tool with this (possibly edited) input.
    Allow {
        /// Input the tool should run with.
        #[serde(rename = "updatedInput")]
        updated_input: Value,
    },
    /// Refuse the tool use.
    Deny {
        /// Explanation surfaced to the agent.
        message: String,
    },
}

impl PermissionResult {
    /// Allow with the given input.
    #[must_use]
    pub fn allow(updated_input: Value) -> Self {
        Self::Allow { updated_input }
    }

    /// Deny with a message.
    #[must_use]
    pub fn deny(message: impl Into<String>) -> Self {
        Self::Deny {
            message: message.into(),
        }
    }

    /// Whether the tool may run.
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow { .. })
    }
}

/// Callback the runtime invokes once per tool-use attempt.
///
/// Implementations must always resolve to a verdict; failures are expressed as
/// [`PermissionResult::Deny`], never as errors.
#[async_trait]
pub trait CanUseTool: Send + Sync {
    /// Decide whether `tool_name` may run with `input`.
    async fn can_use_tool(
        &self,
        tool_name: &str,
        input: Value,
        context: ToolUseContext,
    ) -> PermissionResult;
}

/// Interruption handle for a running query.
#[async_trait]
pub trait QueryControl: Send + Sync {
    /// Ask the runtime to stop cooperatively.
    ///
    /// # Errors
    ///
    /// Returns an error if the request could not be delivered.
    async fn interrupt(&self) -> Result<(), AgentError>;
}

/// Input to [`AgentRuntime::query`].
pub struct QueryRequest {
    /// Prompt text.
    pub prompt: String,
    /// Invocation options.
    pub options: RuntimeOptions,
    /// Tool gate; `None` leaves permission handling to the runtime.
    pub can_use_tool: Option<Arc<dyn CanUseTool>>,
}

impl fmt::Debug for QueryRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryRequest")
            .field("prompt", &self.prompt)
            .field("options", &self.options)
            .field("can_use_tool", &self.can_use_tool.is_some())
            .finish()
    }
}

/// A started runtime invocation.
pub struct Query {
    /// Output stream, in emission order.
    pub messages: MessageStream,
    /// Interrupt handle, shareable with the session registry.
    pub control: Arc<dyn QueryControl>,
}

impl fmt::Debug for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query").finish_non_exhaustive()
    }
}

/// The agent execution engine.
#[async_trait]
pub trait AgentRuntime: Send + Sync {
    /// Start a query.
    ///
    /// # Errors
    ///
    /// Returns an error if the runtime cannot be started.
    async fn query(&self, request: QueryRequest) -> Result<Query, AgentError>;
}
