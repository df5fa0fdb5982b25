//! Approval request identifiers and decisions.

use agentdeck_core::PermissionResponse;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

/// Unique identifier for one tool-use attempt awaiting approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub Uuid);

impl RequestId {
    /// Create a new random request ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The settled answer to a pending approval.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// The human allowed the tool use.
    Allow {
        /// Replacement input for the tool.
        updated_input: Option<Value>,
        /// Rule to add to the session allow-list.
        remember_entry: Option<String>,
    },
    /// The human refused the tool use.
    Deny {
        /// Explanation for the agent.
        message: Option<String>,
    },
    /// The runtime abandoned the attempt, or the registry shut down.
    Cancelled,
    /// Nobody answered in time.
    TimedOut,
}

impl Decision {
    /// Plain allow, input unchanged.
    #[must_use]
    pub fn allow() -> Self {
        Self::Allow {
            updated_input: None,
            remember_entry: None,
        }
    }

    /// Deny with a message.
    #[must_use]
    pub fn deny(message: impl Into<String>) -> Self {
        Self::Deny {
            message: Some(message.into()),
        }
    }

    /// Whether this decision lets the tool run.
    #[must_use]
    pub fn is_allow(&self) -> bool {
        matches!(self, Self::Allow { .. })
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allow { .. } => write!(f, "allow"),
            Self::Deny { .. } => write!(f, "deny"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::TimedOut => write!(f, "timed out"),
        }
    }
}

impl From<PermissionResponse> for Decision {
    fn from(response: PermissionResponse) -> Self {
        if response.allow {
            Self::Allow {
                updated_input: response.updated_input,
                remember_entry: response.remember_entry.filter(|e| !e.trim().is_empty()),
            }
        } else {
            Self::Deny {
                message: response.message,
            }
        }
    }
}
