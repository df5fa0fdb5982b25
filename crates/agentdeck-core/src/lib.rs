//! agentdeck Core - shared types and collaborator traits.
//!
//! This crate defines the two seams the session orchestrator talks through:
//!
//! - [`AgentRuntime`]: the third-party agent engine. It accepts a prompt plus
//!   [`RuntimeOptions`] and returns a [`Query`], an ordered pull-based stream of
//!   [`AgentMessage`]s with an interrupt handle. Tool-use attempts are routed back
//!   through a caller-supplied [`CanUseTool`] gate.
//! - [`ClientChannel`]: the bidirectional client connection (a WebSocket in
//!   production). The orchestrator pushes [`ClientEvent`]s into it and receives
//!   [`PermissionResponse`]s out-of-band.
//!
//! Everything here is transport-agnostic. Concrete bindings live in
//! `agentdeck-claude` (runtime) and the frontends (channels).
//!
//! # Example
//!
//! ```
//! use agentdeck_core::{ClientEvent, TokenBudget};
//!
//! let event = ClientEvent::TokenBudget {
//!     data: TokenBudget { used: 15, total: 160_000 },
//!     session_id: Some("s1".to_string()),
//! };
//! let json = serde_json::to_value(&event).unwrap();
//! assert_eq!(json["type"], "token-budget");
//! assert_eq!(json["sessionId"], "s1");
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod agent;
pub mod channel;
pub mod error;
pub mod message;
pub mod options;

pub use agent::{
    AgentRuntime, CanUseTool, MessageStream, PermissionResult, Query, QueryControl, QueryRequest,
    ToolUseContext,
};
pub use channel::{
    ArcChannel, CancelReason, ClientChannel, ClientEvent, PermissionResponse, TokenBudget,
};
pub use error::{AgentError, AgentResult, ChannelError};
pub use message::AgentMessage;
pub use options::{PermissionMode, Preset, RuntimeOptions, ServerDefinitions, SettingSource};
