//! agentdeck Test - Shared test utilities.
//!
//! This crate provides a scripted [`AgentRuntime`](agentdeck_core::AgentRuntime),
//! a recording [`ClientChannel`](agentdeck_core::ClientChannel) and message
//! fixtures, used across agentdeck crates as a dev-dependency.
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! agentdeck-test.workspace = true
//! ```
//!
//! ```rust,ignore
//! use agentdeck_test::{MockRuntime, RecordingChannel, result_message, system_message};
//!
//! let runtime = Arc::new(
//!     MockRuntime::new()
//!         .message(system_message("s1"))
//!         .message(result_message("s1", 10, 5)),
//! );
//! let channel = Arc::new(RecordingChannel::new());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod fixtures;
pub mod mocks;

pub use fixtures::*;
pub use mocks::*;
