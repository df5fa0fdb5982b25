//! agentdeck Runtime - session orchestration.
//!
//! This crate owns the lifecycle of a single agent request:
//! - Translates an [`InvocationRequest`] into runtime options
//! - Stages inline image attachments and guarantees their cleanup
//! - Gates every tool use through permission rules or a human decision
//! - Streams runtime output to a client channel, in order, with back-pressure
//! - Tracks live sessions so they can be aborted from outside
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use agentdeck_core::{AgentRuntime, ArcChannel};
//! use agentdeck_runtime::{InvocationRequest, OrchestratorConfig, SessionOrchestrator};
//!
//! # async fn example(runtime: Arc<dyn AgentRuntime>, channel: ArcChannel) -> agentdeck_runtime::RuntimeResult<()> {
//! let orchestrator = SessionOrchestrator::new(runtime, OrchestratorConfig::default());
//! orchestrator
//!     .run("Summarize this repo", InvocationRequest::new("/work/repo"), channel)
//!     .await?;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod config_bridge;
pub mod prelude;

mod budget;
mod config;
mod error;
mod gate;
pub mod images;
mod options;
mod orchestrator;
mod registry;
mod request;

pub use budget::extract_token_budget;
pub use config::{ASK_USER_QUESTION, OrchestratorConfig};
pub use error::{RuntimeError, RuntimeResult};
pub use gate::{BLOCKED_BY_SETTINGS, REQUEST_CANCELLED, REQUEST_TIMED_OUT, USER_DENIED};
pub use images::StagedImages;
pub use options::{PLAN_MODE_TOOLS, build_options};
pub use orchestrator::SessionOrchestrator;
pub use registry::{SessionRecord, SessionRegistry, SessionStatus};
pub use request::{ImageAttachment, InvocationRequest, ToolsSettings};
