//! Prelude module - commonly used types for convenient import.
//!
//! Use `use agentdeck_runtime::prelude::*;` to import all essential types.

// Errors
pub use crate::{RuntimeError, RuntimeResult};

// Orchestration
pub use crate::{OrchestratorConfig, SessionOrchestrator};

// Requests
pub use crate::{ImageAttachment, InvocationRequest, ToolsSettings};

// Sessions
pub use crate::{SessionRecord, SessionRegistry, SessionStatus};
