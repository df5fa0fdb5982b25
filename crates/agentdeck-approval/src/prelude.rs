//! Prelude module - commonly used types for convenient import.
//!
//! Use `use agentdeck_approval::prelude::*;` to import all essential types.

pub use crate::{Decision, RequestId};
pub use crate::{PendingApproval, PendingApprovals, WaitOptions};
pub use crate::ToolRules;
