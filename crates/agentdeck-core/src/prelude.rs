//! Prelude module - commonly used types for convenient import.
//!
//! Use `use agentdeck_core::prelude::*;` to import all essential types.

// Errors
pub use crate::{AgentError, AgentResult, ChannelError};

// Runtime collaborator
pub use crate::{AgentMessage, AgentRuntime, CanUseTool, PermissionResult, Query, QueryControl};
pub use crate::{QueryRequest, ToolUseContext};

// Client channel
pub use crate::{ArcChannel, CancelReason, ClientChannel, ClientEvent, PermissionResponse};

// Options
pub use crate::{PermissionMode, RuntimeOptions};
