//! Shared test harness for orchestrator integration tests.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use agentdeck_approval::{Decision, PendingApprovals};
use agentdeck_runtime::{
    InvocationRequest, OrchestratorConfig, RuntimeResult, SessionOrchestrator, SessionRegistry,
};
use agentdeck_test::{MockRuntime, RecordingChannel};
use serde_json::Value;
use tempfile::TempDir;

/// Orchestrator wired to a scripted runtime and a recording channel.
///
/// Owns a `TempDir` used as the request working directory.
#[allow(dead_code)]
pub struct OrchestratorHarness {
    /// The orchestrator under test.
    pub orchestrator: Arc<SessionOrchestrator>,
    /// The scripted runtime.
    pub runtime: Arc<MockRuntime>,
    /// The client channel.
    pub channel: Arc<RecordingChannel>,
    /// Working directory of every request.
    pub workspace: TempDir,
}

#[allow(dead_code)]
impl OrchestratorHarness {
    /// Harness with default config and nobody answering permission requests.
    pub fn new(runtime: MockRuntime) -> Self {
        Self::build(runtime, OrchestratorConfig::default(), None)
    }

    /// Harness with a custom config.
    pub fn with_config(runtime: MockRuntime, config: OrchestratorConfig) -> Self {
        Self::build(runtime, config, None)
    }

    /// Harness whose client answers every permission request with `answer`.
    pub fn with_auto_answer(
        runtime: MockRuntime,
        answer: impl Fn(&str, &Value) -> Decision + Send + Sync + 'static,
    ) -> Self {
        Self::build(runtime, OrchestratorConfig::default(), Some(Box::new(answer)))
    }

    fn build(
        runtime: MockRuntime,
        config: OrchestratorConfig,
        answer: Option<Box<dyn Fn(&str, &Value) -> Decision + Send + Sync>>,
    ) -> Self {
        let workspace = TempDir::new().expect("failed to create tempdir");
        let approvals = Arc::new(PendingApprovals::new());

        let channel = match answer {
            Some(answer) => {
                let approvals = Arc::clone(&approvals);
                RecordingChannel::new().with_responder(move |request_id, tool_name, input| {
                    approvals.resolve(request_id, answer(tool_name, input));
                })
            },
            None => RecordingChannel::new(),
        };

        let runtime = Arc::new(runtime);
        let orchestrator = SessionOrchestrator::with_registries(
            runtime.clone(),
            config,
            Arc::new(SessionRegistry::new()),
            approvals,
        )
        .with_mcp_loader(None);

        Self {
            orchestrator: Arc::new(orchestrator),
            runtime,
            channel: Arc::new(channel),
            workspace,
        }
    }

    /// A fresh request rooted in the workspace.
    pub fn request(&self) -> InvocationRequest {
        InvocationRequest::new(self.workspace.path())
    }

    /// Run `prompt` with `request` to completion.
    pub async fn run(&self, prompt: &str, request: InvocationRequest) -> RuntimeResult<()> {
        self.orchestrator
            .run(prompt, request, self.channel.clone())
            .await
    }

    /// The image staging root under the workspace.
    pub fn images_root(&self) -> PathBuf {
        self.workspace.path().join(".tmp").join("images")
    }

    /// Every file currently under the image staging root.
    pub fn staged_files(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();
        let Ok(dirs) = std::fs::read_dir(self.images_root()) else {
            return files;
        };
        for dir in dirs.flatten() {
            if let Ok(entries) = std::fs::read_dir(dir.path()) {
                files.extend(entries.flatten().map(|e| e.path()));
            }
        }
        files
    }

    /// Wait until `session_id` is registered and active.
    pub async fn wait_for_session(&self, session_id: &str) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !self.orchestrator.is_session_active(session_id).await {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("session never became active");
    }
}
