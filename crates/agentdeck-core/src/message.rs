//! Messages streamed by the agent runtime.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One structured message from the runtime's output stream.
///
/// The payload is kept as raw JSON so that fields this crate does not know
/// about are forwarded to the client untouched. Accessors cover the handful of
/// fields the orchestrator inspects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentMessage(Value);

impl AgentMessage {
    /// Wrap a raw JSON value.
    #[must_use]
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// The `type` discriminator (`system`, `assistant`, `user`, `result`, ...).
    #[must_use]
    pub fn message_type(&self) -> Option<&str> {
        self.0.get("type").and_then(Value::as_str)
    }

    /// Whether this is a terminal `result` message.
    #[must_use]
    pub fn is_result(&self) -> bool {
        self.message_type() == Some("result")
    }

    /// The session identifier, if present and non-empty.
    #[must_use]
    pub fn session_id(&self) -> Option<&str> {
        self.0
            .get("session_id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
    }

    /// The nested tool-call grouping identifier, if present and non-null.
    #[must_use]
    pub fn parent_tool_use_id(&self) -> Option<&Value> {
        self.0.get("parent_tool_use_id").filter(|v| !v.is_null())
    }

    /// Look up an arbitrary top-level field.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Borrow the raw JSON.
    #[must_use]
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Consume into the raw JSON.
    #[must_use]
    pub fn into_value(self) -> Value {
        self.0
    }
}

impl From<Value> for AgentMessage {
    fn from(value: Value) -> Self {
        Self(value)
    }
}
