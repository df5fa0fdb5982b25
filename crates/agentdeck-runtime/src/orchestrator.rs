//! The session orchestrator.
//!
//! Owns the lifecycle of one request: build options, stage images, install the
//! tool gate, start the runtime, stream its output to the client, and clean up
//! on every exit path.

use std::path::PathBuf;
use std::sync::Arc;

use agentdeck_approval::{Decision, PendingApprovals};
use agentdeck_core::{
    AgentMessage, AgentRuntime, ArcChannel, ClientEvent, Query, QueryControl, QueryRequest,
};
use agentdeck_mcp::McpConfigLoader;
use futures::StreamExt;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::budget::extract_token_budget;
use crate::config::OrchestratorConfig;
use crate::error::{RuntimeError, RuntimeResult};
use crate::gate::{SessionIdCell, ToolGate};
use crate::images;
use crate::options::build_options;
use crate::registry::SessionRegistry;
use crate::request::InvocationRequest;

/// Drives runtime invocations and their client conversation.
///
/// Cheap to share behind an `Arc`; each [`run`](Self::run) is independent.
pub struct SessionOrchestrator {
    runtime: Arc<dyn AgentRuntime>,
    config: OrchestratorConfig,
    sessions: Arc<SessionRegistry>,
    approvals: Arc<PendingApprovals>,
    mcp_loader: Option<McpConfigLoader>,
}

impl std::fmt::Debug for SessionOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionOrchestrator")
            .field("config", &self.config)
            .field("mcp_loader", &self.mcp_loader)
            .finish_non_exhaustive()
    }
}

/// Reported to the client when a `run` future is dropped before it finishes.
const RUN_CANCELLED: &str = "Session run cancelled before it finished";

/// Mutable state of one `run`.
///
/// Dropped unfinished, it releases the session itself: the staged images go
/// at once, and a spawned task interrupts the runtime, unregisters the session
/// if the lock was busy, and sends `claude-error`.
struct RunState {
    sessions: Arc<SessionRegistry>,
    channel: ArcChannel,
    control: Option<Arc<dyn QueryControl>>,
    session_id: Arc<SessionIdCell>,
    is_new_session: bool,
    session_created_sent: bool,
    temp_image_paths: Vec<PathBuf>,
    temp_dir: Option<PathBuf>,
    cleaned_up: bool,
    finished: bool,
}

impl RunState {
    fn new(
        sessions: Arc<SessionRegistry>,
        channel: ArcChannel,
        resume: Option<String>,
        staged: images::StagedImages,
    ) -> Self {
        Self {
            sessions,
            channel,
            control: None,
            is_new_session: resume.is_none(),
            session_id: Arc::new(SessionIdCell::new(resume)),
            session_created_sent: false,
            temp_image_paths: staged.paths,
            temp_dir: staged.dir,
            cleaned_up: false,
            finished: false,
        }
    }

    async fn cleanup_images(&mut self) {
        if self.cleaned_up {
            return;
        }
        images::cleanup(&self.temp_image_paths, self.temp_dir.as_deref()).await;
        self.cleaned_up = true;
    }
}

impl Drop for RunState {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let session_id = self.session_id.get();
        warn!(session_id = ?session_id, "Session run dropped before it finished");

        if !self.cleaned_up {
            self.cleaned_up = true;
            images::cleanup_blocking(&self.temp_image_paths, self.temp_dir.as_deref());
        }
        let removed = session_id
            .as_deref()
            .is_none_or(|id| self.sessions.try_remove(id));

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let sessions = Arc::clone(&self.sessions);
        let channel = Arc::clone(&self.channel);
        let control = self.control.take();
        runtime.spawn(async move {
            if let Some(control) = control
                && let Err(e) = control.interrupt().await
            {
                debug!(error = %e, "Interrupt after dropped run failed");
            }
            if !removed && let Some(id) = &session_id {
                sessions.remove(id).await;
            }
            let event = ClientEvent::ClaudeError {
                error: RUN_CANCELLED.to_string(),
                session_id,
            };
            if let Err(e) = channel.send(event).await {
                debug!(error = %e, "Could not report cancelled run to client");
            }
        });
    }
}

impl SessionOrchestrator {
    /// Orchestrator with fresh registries.
    ///
    /// Server definitions come from `config.mcp_config_path`, or
    /// `~/.claude.json` when unset.
    #[must_use]
    pub fn new(runtime: Arc<dyn AgentRuntime>, config: OrchestratorConfig) -> Self {
        Self::with_registries(
            runtime,
            config,
            Arc::new(SessionRegistry::new()),
            Arc::new(PendingApprovals::new()),
        )
    }

    /// Orchestrator sharing existing registries.
    #[must_use]
    pub fn with_registries(
        runtime: Arc<dyn AgentRuntime>,
        config: OrchestratorConfig,
        sessions: Arc<SessionRegistry>,
        approvals: Arc<PendingApprovals>,
    ) -> Self {
        let mcp_loader = match &config.mcp_config_path {
            Some(path) => Some(McpConfigLoader::new(path)),
            None => McpConfigLoader::from_home()
                .inspect_err(|e| warn!(error = %e, "MCP server definitions disabled"))
                .ok(),
        };
        Self {
            runtime,
            config,
            sessions,
            approvals,
            mcp_loader,
        }
    }

    /// Replace the server-definition loader. `None` disables it.
    #[must_use]
    pub fn with_mcp_loader(mut self, loader: Option<McpConfigLoader>) -> Self {
        self.mcp_loader = loader;
        self
    }

    /// The configuration this orchestrator was built with.
    #[must_use]
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// The session registry.
    #[must_use]
    pub fn sessions(&self) -> &Arc<SessionRegistry> {
        &self.sessions
    }

    /// The pending-approval registry.
    #[must_use]
    pub fn approvals(&self) -> &Arc<PendingApprovals> {
        &self.approvals
    }

    /// Run one request to completion.
    ///
    /// The channel always receives a terminal event: `claude-complete` on a
    /// graceful end, `claude-error` otherwise. That includes dropping the
    /// returned future early, which unregisters the session, removes its
    /// images and interrupts the runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the runtime fails to start, its stream fails, or
    /// the channel rejects an event. Cleanup has already run when it returns.
    pub async fn run(
        &self,
        prompt: &str,
        request: InvocationRequest,
        channel: ArcChannel,
    ) -> RuntimeResult<()> {
        let span = info_span!(
            "session_run",
            cwd = ?request.cwd,
            resume = request.session_id.as_deref(),
        );
        self.run_inner(prompt, request, channel).instrument(span).await
    }

    async fn run_inner(
        &self,
        prompt: &str,
        request: InvocationRequest,
        channel: ArcChannel,
    ) -> RuntimeResult<()> {
        let mut options = build_options(&request, &self.config);
        let cwd = request
            .cwd
            .clone()
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."));

        if let Some(loader) = &self.mcp_loader {
            options.mcp_servers = loader.load(&cwd).await;
        }

        let mut staged = images::stage(prompt, &request.images, &cwd).await;
        let prompt = std::mem::take(&mut staged.prompt);
        let mut state = RunState::new(
            Arc::clone(&self.sessions),
            Arc::clone(&channel),
            request.session_id.clone(),
            staged,
        );

        let gate = Arc::new(ToolGate::new(
            &options,
            Arc::clone(&self.approvals),
            Arc::clone(&channel),
            Arc::clone(&state.session_id),
            self.config.interactive_tools.clone(),
            self.config.approval_timeout,
        ));

        let query = QueryRequest {
            prompt,
            options,
            can_use_tool: Some(gate),
        };

        match self.drive(&mut state, query, &channel).await {
            Ok(()) => self.complete(&mut state, &channel).await,
            Err(e) => Err(self.fail(&mut state, &channel, e).await),
        }
    }

    /// Start the runtime and pump its stream until it ends.
    async fn drive(
        &self,
        state: &mut RunState,
        request: QueryRequest,
        channel: &ArcChannel,
    ) -> RuntimeResult<()> {
        let Query {
            mut messages,
            control,
        } = self.runtime.query(request).await?;
        state.control = Some(Arc::clone(&control));

        if let Some(session_id) = state.session_id.get() {
            self.register(state, &session_id, &control).await;
        }

        while let Some(message) = messages.next().await {
            self.forward(state, message?, &control, channel).await?;
        }
        debug!(session_id = ?state.session_id.get(), "Runtime stream ended");
        Ok(())
    }

    async fn register(&self, state: &RunState, session_id: &str, control: &Arc<dyn QueryControl>) {
        self.sessions
            .add(
                session_id,
                Arc::clone(control),
                state.temp_image_paths.clone(),
                state.temp_dir.clone(),
            )
            .await;
    }

    /// Process one runtime message before the next is pulled.
    async fn forward(
        &self,
        state: &mut RunState,
        message: AgentMessage,
        control: &Arc<dyn QueryControl>,
        channel: &ArcChannel,
    ) -> RuntimeResult<()> {
        if state.session_id.get().is_none()
            && let Some(session_id) = message.session_id()
        {
            let session_id = session_id.to_string();
            info!(session_id = %session_id, "Runtime assigned session");
            state.session_id.set(&session_id);
            self.register(state, &session_id, control).await;
            channel.set_session_id(&session_id);

            if state.is_new_session && !state.session_created_sent {
                state.session_created_sent = true;
                channel
                    .send(ClientEvent::SessionCreated {
                        session_id: session_id.clone(),
                    })
                    .await?;
            }
        }

        let session_id = state.session_id.get();
        let budget = if message.is_result() {
            extract_token_budget(&message, self.config.context_window)
        } else {
            None
        };

        let parent = message.parent_tool_use_id().cloned();
        let mut data = message.into_value();
        if let Some(parent) = parent
            && let Some(fields) = data.as_object_mut()
        {
            fields.insert("parentToolUseId".to_string(), parent);
        }

        channel
            .send(ClientEvent::ClaudeResponse {
                data,
                session_id: session_id.clone(),
            })
            .await?;

        if let Some(budget) = budget {
            debug!(used = budget.used, total = budget.total, "Token budget");
            channel
                .send(ClientEvent::TokenBudget {
                    data: budget,
                    session_id,
                })
                .await?;
        }
        Ok(())
    }

    async fn complete(&self, state: &mut RunState, channel: &ArcChannel) -> RuntimeResult<()> {
        let session_id = state.session_id.get();
        if let Some(id) = &session_id {
            self.sessions.remove(id).await;
        }
        state.cleanup_images().await;
        state.finished = true;

        let event = ClientEvent::ClaudeComplete {
            session_id: session_id.clone(),
            exit_code: 0,
            is_new_session: state.is_new_session,
        };
        if let Err(e) = channel.send(event).await {
            return Err(self.fail(state, channel, e.into()).await);
        }
        info!(session_id = ?session_id, "Session run complete");
        Ok(())
    }

    /// Error exit: unregister, clean up, report, and hand the error back.
    async fn fail(
        &self,
        state: &mut RunState,
        channel: &ArcChannel,
        err: RuntimeError,
    ) -> RuntimeError {
        let session_id = state.session_id.get();
        error!(session_id = ?session_id, error = %err, "Session run failed");

        if let Some(id) = &session_id {
            self.sessions.remove(id).await;
        }
        state.cleanup_images().await;
        state.finished = true;

        let event = ClientEvent::ClaudeError {
            error: err.to_string(),
            session_id,
        };
        if let Err(e) = channel.send(event).await {
            warn!(error = %e, "Could not report session failure to client");
        }
        err
    }

    /// Interrupt a running session and release its resources.
    ///
    /// Returns `false` if the session is unknown or the interrupt could not be
    /// delivered. Never fails.
    pub async fn abort(&self, session_id: &str) -> bool {
        let Some(record) = self.sessions.get(session_id).await else {
            debug!(session_id = %session_id, "Abort requested for unknown session");
            return false;
        };

        if let Err(e) = record.handle.interrupt().await {
            warn!(session_id = %session_id, error = %e, "Failed to interrupt session");
            return false;
        }

        self.sessions.mark_aborted(session_id).await;
        images::cleanup(&record.temp_image_paths, record.temp_dir.as_deref()).await;
        self.sessions.remove(session_id).await;
        info!(session_id = %session_id, "Session aborted");
        true
    }

    /// Forward a client's decision to the waiting tool gate.
    ///
    /// Returns `false` if no question with that id is outstanding.
    pub fn resolve_tool_approval(&self, request_id: &str, decision: Decision) -> bool {
        let resolved = self.approvals.resolve(request_id, decision);
        if !resolved {
            debug!(request_id = %request_id, "Dropping decision for unknown permission request");
        }
        resolved
    }

    /// Ids of all running sessions.
    pub async fn active_session_ids(&self) -> Vec<String> {
        self.sessions.list_ids().await
    }

    /// Whether `session_id` is running and not aborted.
    pub async fn is_session_active(&self, session_id: &str) -> bool {
        self.sessions.is_active(session_id).await
    }
}
