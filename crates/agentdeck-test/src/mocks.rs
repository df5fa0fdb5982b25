//! Mock implementations of the runtime and client channel collaborators.
//!
//! Both use `std::sync::Mutex` internally so builders and assertions work
//! without a tokio runtime.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use agentdeck_core::{
    AgentError, AgentMessage, AgentRuntime, CanUseTool, ChannelError, ClientChannel, ClientEvent,
    PermissionResult, Query, QueryControl, QueryRequest, RuntimeOptions, ToolUseContext,
};
use async_trait::async_trait;
use futures::StreamExt;
use serde_json::Value;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One step of a [`MockRuntime`] script.
#[derive(Debug, Clone)]
pub enum ScriptStep {
    /// Yield a message.
    Message(AgentMessage),
    /// Ask the installed gate about a tool use and record the answer.
    ToolUse {
        /// Tool name.
        tool_name: String,
        /// Proposed input.
        input: Value,
        /// Cancel the attempt's signal after this long.
        cancel_after: Option<Duration>,
    },
    /// Yield a stream error and end the script.
    Fail(String),
    /// Block until the query is interrupted.
    WaitForInterrupt,
    /// Sleep before the next step.
    Delay(Duration),
}

/// A prompt and options the mock was queried with.
#[derive(Debug, Clone)]
pub struct RecordedQuery {
    /// Prompt text.
    pub prompt: String,
    /// Runtime options.
    pub options: RuntimeOptions,
    /// Whether a tool gate was installed.
    pub has_gate: bool,
}

/// Scripted [`AgentRuntime`].
///
/// Every query plays the same script from the start.
#[derive(Debug, Default)]
pub struct MockRuntime {
    script: Vec<ScriptStep>,
    start_error: Option<String>,
    interrupt_error: Option<String>,
    interrupts: Arc<AtomicUsize>,
    permission_results: Arc<Mutex<Vec<(String, PermissionResult)>>>,
    queries: Mutex<Vec<RecordedQuery>>,
}

impl MockRuntime {
    /// Create a runtime with an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message.
    #[must_use]
    pub fn message(mut self, message: impl Into<AgentMessage>) -> Self {
        self.script.push(ScriptStep::Message(message.into()));
        self
    }

    /// Append a tool-use attempt.
    #[must_use]
    pub fn tool_use(mut self, tool_name: impl Into<String>, input: Value) -> Self {
        self.script.push(ScriptStep::ToolUse {
            tool_name: tool_name.into(),
            input,
            cancel_after: None,
        });
        self
    }

    /// Append a tool-use attempt that the runtime abandons after `after`.
    #[must_use]
    pub fn tool_use_cancelled_after(
        mut self,
        tool_name: impl Into<String>,
        input: Value,
        after: Duration,
    ) -> Self {
        self.script.push(ScriptStep::ToolUse {
            tool_name: tool_name.into(),
            input,
            cancel_after: Some(after),
        });
        self
    }

    /// Append a stream failure.
    #[must_use]
    pub fn fail(mut self, message: impl Into<String>) -> Self {
        self.script.push(ScriptStep::Fail(message.into()));
        self
    }

    /// Append a step that blocks until interrupted.
    #[must_use]
    pub fn wait_for_interrupt(mut self) -> Self {
        self.script.push(ScriptStep::WaitForInterrupt);
        self
    }

    /// Append a pause.
    #[must_use]
    pub fn delay(mut self, duration: Duration) -> Self {
        self.script.push(ScriptStep::Delay(duration));
        self
    }

    /// Make `query` itself fail.
    #[must_use]
    pub fn fail_on_start(mut self, message: impl Into<String>) -> Self {
        self.start_error = Some(message.into());
        self
    }

    /// Make `interrupt` fail.
    #[must_use]
    pub fn fail_on_interrupt(mut self, message: impl Into<String>) -> Self {
        self.interrupt_error = Some(message.into());
        self
    }

    /// How many times any query was interrupted.
    #[must_use]
    pub fn interrupt_count(&self) -> usize {
        self.interrupts.load(Ordering::SeqCst)
    }

    /// Gate answers, in the order the tool uses were played.
    #[must_use]
    pub fn permission_results(&self) -> Vec<(String, PermissionResult)> {
        lock(&self.permission_results).clone()
    }

    /// All queries received so far.
    #[must_use]
    pub fn queries(&self) -> Vec<RecordedQuery> {
        lock(&self.queries).clone()
    }

    /// Prompt of the latest query.
    #[must_use]
    pub fn last_prompt(&self) -> Option<String> {
        lock(&self.queries).last().map(|q| q.prompt.clone())
    }

    /// Options of the latest query.
    #[must_use]
    pub fn last_options(&self) -> Option<RuntimeOptions> {
        lock(&self.queries).last().map(|q| q.options.clone())
    }
}

#[async_trait]
impl AgentRuntime for MockRuntime {
    async fn query(&self, request: QueryRequest) -> Result<Query, AgentError> {
        lock(&self.queries).push(RecordedQuery {
            prompt: request.prompt.clone(),
            options: request.options.clone(),
            has_gate: request.can_use_tool.is_some(),
        });

        if let Some(message) = &self.start_error {
            return Err(AgentError::Spawn(message.clone()));
        }

        let interrupted = CancellationToken::new();
        let playback = Playback {
            steps: self.script.iter().cloned().collect(),
            gate: request.can_use_tool,
            interrupted: interrupted.clone(),
            results: Arc::clone(&self.permission_results),
        };

        let messages = futures::stream::unfold(playback, |mut playback| async move {
            loop {
                match playback.steps.pop_front()? {
                    ScriptStep::Message(message) => return Some((Ok(message), playback)),
                    ScriptStep::Fail(message) => {
                        playback.steps.clear();
                        return Some((Err(AgentError::Stream(message)), playback));
                    },
                    ScriptStep::ToolUse {
                        tool_name,
                        input,
                        cancel_after,
                    } => playback.use_tool(tool_name, input, cancel_after).await,
                    ScriptStep::WaitForInterrupt => playback.interrupted.cancelled().await,
                    ScriptStep::Delay(duration) => tokio::time::sleep(duration).await,
                }
            }
        })
        .boxed();

        Ok(Query {
            messages,
            control: Arc::new(MockControl {
                interrupted,
                count: Arc::clone(&self.interrupts),
                error: self.interrupt_error.clone(),
            }),
        })
    }
}

struct Playback {
    steps: VecDeque<ScriptStep>,
    gate: Option<Arc<dyn CanUseTool>>,
    interrupted: CancellationToken,
    results: Arc<Mutex<Vec<(String, PermissionResult)>>>,
}

impl Playback {
    async fn use_tool(&self, tool_name: String, input: Value, cancel_after: Option<Duration>) {
        let signal = CancellationToken::new();
        if let Some(after) = cancel_after {
            let signal = signal.clone();
            tokio::spawn(async move {
                tokio::time::sleep(after).await;
                signal.cancel();
            });
        }

        let result = match &self.gate {
            Some(gate) => {
                gate.can_use_tool(&tool_name, input, ToolUseContext::new(signal))
                    .await
            },
            None => PermissionResult::allow(input),
        };
        tracing::debug!(tool = %tool_name, ?result, "Mock tool use settled");
        lock(&self.results).push((tool_name, result));
    }
}

struct MockControl {
    interrupted: CancellationToken,
    count: Arc<AtomicUsize>,
    error: Option<String>,
}

#[async_trait]
impl QueryControl for MockControl {
    async fn interrupt(&self) -> Result<(), AgentError> {
        self.count.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.error {
            return Err(AgentError::Interrupt(message.clone()));
        }
        self.interrupted.cancel();
        Ok(())
    }
}

/// Callback run for each permission request: `(request_id, tool_name, input)`.
pub type PermissionResponder = Arc<dyn Fn(&str, &str, &Value) + Send + Sync>;

/// [`ClientChannel`] that records everything sent to it.
#[derive(Default)]
pub struct RecordingChannel {
    events: Mutex<Vec<ClientEvent>>,
    session_ids: Mutex<Vec<String>>,
    requests_taken: Mutex<usize>,
    notify: Notify,
    fail: bool,
    responder: Option<PermissionResponder>,
}

impl fmt::Debug for RecordingChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordingChannel")
            .field("events", &lock(&self.events).len())
            .field("fail", &self.fail)
            .field("responder", &self.responder.is_some())
            .finish_non_exhaustive()
    }
}

impl RecordingChannel {
    /// Create an empty recording channel.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every send with [`ChannelError::Closed`].
    #[must_use]
    pub fn fail_on_send(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Answer permission requests as they are sent.
    #[must_use]
    pub fn with_responder(
        mut self,
        responder: impl Fn(&str, &str, &Value) + Send + Sync + 'static,
    ) -> Self {
        self.responder = Some(Arc::new(responder));
        self
    }

    /// Everything sent so far.
    #[must_use]
    pub fn events(&self) -> Vec<ClientEvent> {
        lock(&self.events).clone()
    }

    /// Wire types of everything sent so far.
    #[must_use]
    pub fn event_types(&self) -> Vec<&'static str> {
        lock(&self.events).iter().map(ClientEvent::event_type).collect()
    }

    /// Ids passed to `set_session_id`, in order.
    #[must_use]
    pub fn session_ids(&self) -> Vec<String> {
        lock(&self.session_ids).clone()
    }

    /// Request ids of every permission request sent so far.
    #[must_use]
    pub fn permission_request_ids(&self) -> Vec<String> {
        lock(&self.events)
            .iter()
            .filter_map(|event| match event {
                ClientEvent::ClaudePermissionRequest { request_id, .. } => {
                    Some(request_id.clone())
                },
                _ => None,
            })
            .collect()
    }

    /// Wait for the next permission request not yet returned by this method.
    pub async fn wait_for_permission_request(&self) -> String {
        loop {
            let mut notified = std::pin::pin!(self.notify.notified());
            notified.as_mut().enable();

            if let Some(id) = self.take_next_request() {
                return id;
            }
            notified.await;
        }
    }

    fn take_next_request(&self) -> Option<String> {
        let mut taken = lock(&self.requests_taken);
        let id = self.permission_request_ids().into_iter().nth(*taken)?;
        *taken = taken.saturating_add(1);
        Some(id)
    }
}

#[async_trait]
impl ClientChannel for RecordingChannel {
    async fn send(&self, event: ClientEvent) -> Result<(), ChannelError> {
        if self.fail {
            return Err(ChannelError::Closed);
        }

        let request = match &event {
            ClientEvent::ClaudePermissionRequest {
                request_id,
                tool_name,
                input,
                ..
            } => Some((request_id.clone(), tool_name.clone(), input.clone())),
            _ => None,
        };

        lock(&self.events).push(event);
        self.notify.notify_waiters();

        if let (Some(responder), Some((request_id, tool_name, input))) = (&self.responder, request)
        {
            responder(&request_id, &tool_name, &input);
        }
        Ok(())
    }

    fn set_session_id(&self, session_id: &str) {
        lock(&self.session_ids).push(session_id.to_string());
    }
}
