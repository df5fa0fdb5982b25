//! agentdeck Approval - human-in-the-loop tool-use approvals.
//!
//! Two pieces live here:
//!
//! - [`PendingApprovals`]: the registry of permission questions that are waiting
//!   on a human. Each question is registered before it is published, then
//!   settled exactly once by an explicit answer, a timeout, or the runtime
//!   abandoning the tool-use attempt.
//! - [`rules`]: the permission matcher that decides whether a tool call is
//!   covered by an allow or deny rule without asking anyone.
//!
//! # Example
//!
//! ```
//! use agentdeck_approval::rules::matches;
//! use serde_json::json;
//!
//! assert!(matches("Write", "Write", &json!({})));
//! assert!(matches("Bash(git:*)", "Bash", &json!({"command": "git status"})));
//! assert!(!matches("Bash(git:*)", "Bash", &json!({"command": "rm -rf ."})));
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod decision;
pub mod pending;
pub mod rules;

pub use decision::{Decision, RequestId};
pub use pending::{PendingApproval, PendingApprovals, WaitOptions};
pub use rules::ToolRules;
